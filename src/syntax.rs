use derive_more::Display;

/// The schema dialect tag governing default values and some cross-reference rules.
/// Carried by every [`crate::message::Message`] and [`crate::enum_def::Enum`].
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    #[display(fmt = "proto2")]
    Proto2,
    #[display(fmt = "proto3")]
    Proto3,
}

impl Syntax {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("proto3") => Syntax::Proto3,
            _ => Syntax::Proto2,
        }
    }
}
