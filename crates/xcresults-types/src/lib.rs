//! Typed views over both ends of the conversion.
//!
//! - [`record`]: the closed set of xcresult record kinds, decoded explicitly
//!   per variant from `xcresulttool` JSON documents.
//! - [`report`]: the Allure 2 entities the projector produces.
//! - [`warning`]: non-fatal findings accumulated during a run.

pub mod path;
pub mod record;
pub mod report;
pub mod status;
pub mod value;
pub mod warning;

pub use path::RecordPath;
pub use record::{ChildSlot, DecodeError, Record, RecordId, RecordKind, Reference};
pub use report::{
    Attachment, Container, Conversion, Label, Link, Parameter, Stage, Status, StatusDetails, Step,
    TestResult,
};
pub use status::SourceStatus;
pub use warning::{Warning, WarningKind};
