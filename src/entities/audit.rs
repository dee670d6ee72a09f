use chrono::{DateTime, Utc};
use sea_orm::Set;

use super::{dish, setmeal};

/// Who touched a row, and when. Built once per operation and applied
/// explicitly at the insert/update call site; there is no ambient
/// "current user" and no reflection-driven fill.
#[derive(Debug, Clone, Copy)]
pub struct AuditStamp {
    pub at: DateTime<Utc>,
    pub by: i64,
}

impl AuditStamp {
    pub fn now(actor: i64) -> Self {
        Self {
            at: Utc::now(),
            by: actor,
        }
    }
}

/// Rows carrying the four audit columns.
pub trait Audited {
    fn apply_created(&mut self, stamp: &AuditStamp);
    fn apply_updated(&mut self, stamp: &AuditStamp);
}

macro_rules! impl_audited {
    ($active:path) => {
        impl Audited for $active {
            fn apply_created(&mut self, stamp: &AuditStamp) {
                self.created_at = Set(stamp.at);
                self.created_by = Set(Some(stamp.by));
                self.updated_at = Set(Some(stamp.at));
                self.updated_by = Set(Some(stamp.by));
            }

            fn apply_updated(&mut self, stamp: &AuditStamp) {
                self.updated_at = Set(Some(stamp.at));
                self.updated_by = Set(Some(stamp.by));
            }
        }
    };
}

impl_audited!(dish::ActiveModel);
impl_audited!(setmeal::ActiveModel);
