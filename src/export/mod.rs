//! Export functionality: persisting matching attachments.

pub mod attachment;

pub use attachment::AttachmentPersister;
