//! Data models for Airtrack

/// Stores an enum as TEXT/VARCHAR using its `as_str()` and `FromStr<Err = String>` impls
macro_rules! pg_text_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub mod catalog;
pub mod change;
pub mod equipment;
pub mod installation;
pub mod repair;
pub mod system;
pub mod user;

// Re-export commonly used types
pub use catalog::CatalogEntry;
pub use change::{ChangeAction, ChangeSet, EntityType};
pub use equipment::{Equipment, EquipmentStatus, SerialLookup};
pub use installation::{Installation, Terminal};
pub use repair::{RepairBatch, RepairBatchItem, RepairBatchStatus, RepairNumber};
pub use system::{EquipmentRef, System, SystemPolicy};
pub use user::{Role, UserClaims};

/// Trim a text input and turn blank strings into `None`
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  SN-1 ".into())), Some("SN-1".into()));
        assert_eq!(normalize_text(Some("   ".into())), None);
        assert_eq!(normalize_text(None), None);
    }
}
