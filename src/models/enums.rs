use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(DoseStatus {
    Pending => "PENDING",
    Reminded => "REMINDED",
    Followup => "FOLLOWUP",
    Taken => "TAKEN",
});

str_enum!(AdherenceMethod {
    PushSelfReport => "push_self_report",
    PhoneReminder => "phone_reminder",
    PhoneFollowup => "phone_followup",
    ManualEntry => "manual_entry",
});

str_enum!(ScriptType {
    Reminder => "reminder",
    Followup => "followup",
});

str_enum!(Classification {
    Confirmed => "confirmed",
    Declined => "declined",
    Unclear => "unclear",
});

str_enum!(AlertKind {
    FollowupDeclined => "followup_declined",
    FollowupUnresolved => "followup_unresolved",
});

impl ScriptType {
    /// Adherence method recorded when a call of this kind is answered "yes".
    pub fn adherence_method(&self) -> AdherenceMethod {
        match self {
            Self::Reminder => AdherenceMethod::PhoneReminder,
            Self::Followup => AdherenceMethod::PhoneFollowup,
        }
    }
}
