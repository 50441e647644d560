//! Stream block assembly
//!
//! Folds the tokenizer's flat `(path id, item)` sequence into one block per
//! container occurrence, keyed by fourcc for lookup.

use std::collections::HashMap;

use crate::error::{GpmfError, Result};
use crate::parser::stream::KlvTokenizer;
use crate::types::{FourCC, KlvItem};

/// All KLV items of one container occurrence
#[derive(Debug, Clone)]
pub struct StreamBlock {
    pub path: String,
    items: HashMap<FourCC, KlvItem>,
}

impl StreamBlock {
    pub fn new(path: String) -> Self {
        Self {
            path,
            items: HashMap::new(),
        }
    }

    /// Insert an item; a repeated key within one block overwrites
    pub fn insert(&mut self, item: KlvItem) {
        self.items.insert(item.key, item);
    }

    pub fn get(&self, key: FourCC) -> Option<&KlvItem> {
        self.items.get(&key)
    }

    pub fn contains(&self, key: FourCC) -> bool {
        self.items.contains_key(&key)
    }

    /// Lookup that fails with the block's path and the missing key
    pub fn require(&self, key: FourCC) -> Result<&KlvItem> {
        self.items
            .get(&key)
            .ok_or_else(|| GpmfError::MissingRequiredField {
                block: self.path.clone(),
                key: key.to_string(),
            })
    }

    /// Keys present, for skip diagnostics
    pub fn key_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.items.keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Regroup tokenized items into blocks, one per distinct path id,
/// preserving the order in which path ids are first seen
pub fn assemble_blocks(tokens: KlvTokenizer<'_>) -> Result<Vec<StreamBlock>> {
    let mut blocks: Vec<StreamBlock> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for token in tokens {
        let (path, item) = token?;
        let slot = match index.get(&path) {
            Some(&i) => i,
            None => {
                index.insert(path.clone(), blocks.len());
                blocks.push(StreamBlock::new(path));
                blocks.len() - 1
            }
        };
        blocks[slot].insert(item);
    }

    Ok(blocks)
}
