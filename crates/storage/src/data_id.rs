use serde::{Deserialize, Serialize};
use std::fmt;

/// The named blobs a form document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataId {
    /// `WM(Formular(...))`: fields, window layout, visibility and functions.
    FormDescription,
    /// `WM(Formularwerte((ID .. VALUE ..) ...))`
    FormValues,
    /// A bare print function name or `WM(Druckfunktionen(...))`.
    PrintFunction,
    /// Free-text document type tag.
    SetType,
    /// `WM(Seriendruck(...))`
    MailMerge,
}

impl DataId {
    pub const ALL: [DataId; 5] = [
        DataId::FormDescription,
        DataId::FormValues,
        DataId::PrintFunction,
        DataId::SetType,
        DataId::MailMerge,
    ];

    /// The key under which the host stores the blob.
    pub fn key(self) -> &'static str {
        match self {
            DataId::FormDescription => "WollMuxFormularbeschreibung",
            DataId::FormValues => "WollMuxFormularwerte",
            DataId::PrintFunction => "PrintFunction",
            DataId::SetType => "SetType",
            DataId::MailMerge => "WollMuxSeriendruck",
        }
    }

    pub fn from_key(key: &str) -> Option<DataId> {
        DataId::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
