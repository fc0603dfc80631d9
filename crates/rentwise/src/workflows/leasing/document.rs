use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::portfolio::LandlordId;
use crate::store::RepositoryError;

use super::builder::{LeaseBuildError, LeaseBuilder, LeaseDraft, LeaseTerms};
use super::jurisdiction::ClauseRegistry;
use super::render::render_html;

string_id!(DocumentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Landlord-supplied template used verbatim as a lease body.
    Uploaded,
    Generated,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::Uploaded => "uploaded",
            DocumentKind::Generated => "generated",
        }
    }
}

/// Stored document record that can be assigned as a property's default lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalDocument {
    pub id: DocumentId,
    pub landlord_id: LandlordId,
    pub title: String,
    pub kind: DocumentKind,
    pub storage_key: String,
    pub content_type: String,
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

/// SHA-256 of a document's bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentDigest(String);

impl DocumentDigest {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, presented: &str) -> bool {
        self.0.eq_ignore_ascii_case(presented.trim())
    }
}

impl fmt::Display for DocumentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to format document: {0}")]
    Format(#[from] fmt::Error),
    #[error("renderer unavailable: {0}")]
    Backend(String),
}

/// Converts an assembled lease into its final bytes (HTML today, PDF via an external service).
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, draft: &LeaseDraft) -> Result<RenderedDocument, RenderError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlDocumentRenderer;

impl DocumentRenderer for HtmlDocumentRenderer {
    fn render(&self, draft: &LeaseDraft) -> Result<RenderedDocument, RenderError> {
        let html = render_html(draft)?;
        Ok(RenderedDocument {
            bytes: html.into_bytes(),
            content_type: mime::TEXT_HTML_UTF_8.to_string(),
            extension: "html",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Backend(String),
}

/// Blob storage for document bytes; returns the key the object can be fetched by.
pub trait DocumentStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl InMemoryDocumentStore {
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        let key = key.strip_prefix("memory://").unwrap_or(key);
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StoreError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Backend("document store lock poisoned".to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("memory://{key}"))
    }
}

pub trait DocumentRepository: Send + Sync {
    fn insert_document(&self, document: LegalDocument) -> Result<LegalDocument, RepositoryError>;
    fn document(&self, id: &DocumentId) -> Result<Option<LegalDocument>, RepositoryError>;
    fn documents_for_landlord(
        &self,
        landlord: &LandlordId,
    ) -> Result<Vec<LegalDocument>, RepositoryError>;
}

/// A generated lease or addendum with its stored record.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub draft: LeaseDraft,
    pub document: LegalDocument,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Build(#[from] LeaseBuildError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("{0}")]
    Validation(String),
}

static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{id:06}"))
}

const UPLOAD_TYPES: [(&str, &str); 4] = [
    ("application/pdf", "pdf"),
    ("text/html", "html"),
    ("text/plain", "txt"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
];

fn upload_extension(content_type: &str) -> Result<&'static str, DocumentError> {
    let parsed: mime::Mime = content_type
        .parse()
        .map_err(|_| DocumentError::Validation(format!("invalid content type '{content_type}'")))?;
    let essence = parsed.essence_str();
    UPLOAD_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == essence)
        .map(|(_, extension)| *extension)
        .ok_or_else(|| {
            DocumentError::Validation(format!("unsupported lease document type '{essence}'"))
        })
}

/// Builds, renders, stores and records lease documents.
pub struct LeaseDocumentService {
    registry: Arc<ClauseRegistry>,
    renderer: Arc<dyn DocumentRenderer>,
    store: Arc<dyn DocumentStore>,
    documents: Arc<dyn DocumentRepository>,
}

impl LeaseDocumentService {
    pub fn new(
        registry: Arc<ClauseRegistry>,
        renderer: Arc<dyn DocumentRenderer>,
        store: Arc<dyn DocumentStore>,
        documents: Arc<dyn DocumentRepository>,
    ) -> Self {
        Self {
            registry,
            renderer,
            store,
            documents,
        }
    }

    pub fn registry(&self) -> &ClauseRegistry {
        &self.registry
    }

    /// Assemble and render a lease without storing anything.
    pub fn preview(&self, terms: &LeaseTerms, at: DateTime<Utc>) -> Result<String, DocumentError> {
        let draft = LeaseBuilder::new(&self.registry).build(terms, at.date_naive())?;
        Ok(render_html(&draft).map_err(RenderError::from)?)
    }

    /// Generate the full lease for the given terms.
    pub fn generate(
        &self,
        terms: &LeaseTerms,
        at: DateTime<Utc>,
    ) -> Result<GeneratedDocument, DocumentError> {
        let draft = LeaseBuilder::new(&self.registry).build(terms, at.date_naive())?;
        self.persist(terms, draft, "lease", at)
    }

    /// Generate only the jurisdiction disclosures, for use next to an uploaded lease.
    pub fn generate_addendum(
        &self,
        terms: &LeaseTerms,
        at: DateTime<Utc>,
    ) -> Result<GeneratedDocument, DocumentError> {
        let draft = LeaseBuilder::new(&self.registry).build_addendum(terms, at.date_naive())?;
        self.persist(terms, draft, "addendum", at)
    }

    fn persist(
        &self,
        terms: &LeaseTerms,
        draft: LeaseDraft,
        prefix: &str,
        at: DateTime<Utc>,
    ) -> Result<GeneratedDocument, DocumentError> {
        let rendered = self.renderer.render(&draft)?;
        let digest = DocumentDigest::of(&rendered.bytes);
        let id = next_document_id();
        let key = format!(
            "{prefix}s/{}/{}.{}",
            terms.landlord.id, id, rendered.extension
        );
        let storage_key = self
            .store
            .put(&key, &rendered.bytes, &rendered.content_type)?;

        let document = self.documents.insert_document(LegalDocument {
            id,
            landlord_id: terms.landlord.id.clone(),
            title: draft.title.clone(),
            kind: DocumentKind::Generated,
            storage_key,
            content_type: rendered.content_type,
            digest: digest.to_string(),
            created_at: at,
        })?;

        info!(
            document_id = %document.id,
            landlord_id = %document.landlord_id,
            disclosures = draft.disclosures.len(),
            "{prefix} document generated"
        );
        Ok(GeneratedDocument { draft, document })
    }

    /// Store a landlord-supplied lease template.
    pub fn register_upload(
        &self,
        landlord_id: &LandlordId,
        title: &str,
        bytes: &[u8],
        content_type: &str,
        at: DateTime<Utc>,
    ) -> Result<LegalDocument, DocumentError> {
        if title.trim().is_empty() {
            return Err(DocumentError::Validation(
                "document title is required".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(DocumentError::Validation(
                "uploaded document is empty".to_string(),
            ));
        }
        let extension = upload_extension(content_type)?;

        let id = next_document_id();
        let key = format!("uploads/{landlord_id}/{id}.{extension}");
        let storage_key = self.store.put(&key, bytes, content_type)?;

        let document = self.documents.insert_document(LegalDocument {
            id,
            landlord_id: landlord_id.clone(),
            title: title.trim().to_string(),
            kind: DocumentKind::Uploaded,
            storage_key,
            content_type: content_type.to_string(),
            digest: DocumentDigest::of(bytes).to_string(),
            created_at: at,
        })?;
        info!(document_id = %document.id, landlord_id = %landlord_id, "lease template uploaded");
        Ok(document)
    }

    pub fn document(&self, id: &DocumentId) -> Result<Option<LegalDocument>, DocumentError> {
        Ok(self.documents.document(id)?)
    }
}
