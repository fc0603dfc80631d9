//! Lease document assembly, signatures and the lease audit trail.

pub mod agreement;
pub mod audit;
pub mod builder;
pub mod document;
pub mod drive;
pub mod jurisdiction;
pub mod render;
pub mod router;
pub mod signatures;

pub use agreement::{LeaseAgreement, LeaseId, LeaseRepository, LeaseStateError, LeaseStatus};
pub use audit::{AuditError, AuditEvent, AuditTrail};
pub use builder::{LateFee, LeaseBuildError, LeaseBuilder, LeaseDraft, LeaseTerms, SectionKind};
pub use document::{
    DocumentDigest, DocumentError, DocumentId, DocumentKind, DocumentRenderer, DocumentRepository,
    DocumentStore, GeneratedDocument, HtmlDocumentRenderer, InMemoryDocumentStore,
    LeaseDocumentService, LegalDocument,
};
pub use drive::GoogleDriveDocumentStore;
pub use router::leasing_router;
pub use signatures::{
    SignatureRepository, SignatureRequest, SignatureRequestId, SignatureStatus, SignerRole,
    SigningError, SigningService,
};
