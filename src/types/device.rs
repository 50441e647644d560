/// Recording-device identity carried in DEVC blocks (DVID/DVNM keys)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: Option<u64>,
    pub name: Option<String>,
}

impl DeviceInfo {
    pub fn is_known(&self) -> bool {
        self.id.is_some() || self.name.is_some()
    }
}
