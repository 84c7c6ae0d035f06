use lopdf::{Document, Error as PdfError};
use std::path::{Path, PathBuf};

/// Result of one unlock attempt. Expected failure modes are carried as a
/// message; only genuinely unclassified faults surface elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    Success { output: PathBuf },
    Failure { message: String },
}

impl UnlockOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Remove the password protection from the PDF at `input_path` and write the
/// unlocked document to `output_path`. Exactly one password attempt is made.
pub fn unlock_pdf(input_path: &Path, output_path: &Path, password: &str) -> UnlockOutcome {
    if !input_path.exists() {
        return UnlockOutcome::failure(format!("PDF file not found: {}", input_path.display()));
    }

    tracing::info!("Opening PDF file: {}", input_path.display());
    let probe = match Document::load(input_path) {
        Ok(doc) => doc,
        Err(e) => return UnlockOutcome::failure(format!("Error opening PDF: {}", e)),
    };

    // Unlocking a document that carries no protection is refused outright.
    if !probe.is_encrypted() && !probe.was_encrypted() {
        tracing::info!("PDF is not encrypted");
        return UnlockOutcome::failure("This PDF is not password protected");
    }
    drop(probe);

    // The plain load may already have authenticated with the empty password;
    // either way the caller's candidate is the secret that must unlock the
    // file, so re-open with it.
    tracing::info!("PDF is encrypted, attempting to decrypt");
    let decrypted = match Document::load_with_password(input_path, password) {
        Ok(doc) => doc,
        Err(PdfError::InvalidPassword) => {
            return UnlockOutcome::failure("Invalid password for PDF file");
        }
        Err(e) => return UnlockOutcome::failure(format!("Error during decryption: {}", e)),
    };

    let page_count = decrypted.get_pages().len();
    let mut rebuilt = match rebuild_unlocked(&decrypted) {
        Ok(doc) => doc,
        Err(e) => return UnlockOutcome::failure(format!("Error processing PDF pages: {}", e)),
    };
    if rebuilt.get_pages().len() != page_count {
        return UnlockOutcome::failure(
            "Error processing PDF pages: page tree did not survive the rebuild",
        );
    }

    tracing::info!("Writing unlocked PDF to: {}", output_path.display());
    match rebuilt.save(output_path) {
        Ok(_) => UnlockOutcome::Success {
            output: output_path.to_path_buf(),
        },
        Err(e) => UnlockOutcome::failure(format!("Error processing PDF pages: {}", e)),
    }
}

/// Carry the decrypted object graph into a fresh document whose trailer keeps
/// only the structural entries. Page order is that of the source page tree;
/// page content is untouched and no encryption metadata survives.
fn rebuild_unlocked(source: &Document) -> Result<Document, PdfError> {
    let mut rebuilt = Document::with_version(source.version.clone());
    rebuilt.objects = source.objects.clone();
    rebuilt.max_id = source.max_id;

    rebuilt
        .trailer
        .set("Root", source.trailer.get(b"Root")?.clone());
    if let Ok(info) = source.trailer.get(b"Info") {
        rebuilt.trailer.set("Info", info.clone());
    }
    if let Ok(id) = source.trailer.get(b"ID") {
        rebuilt.trailer.set("ID", id.clone());
    }

    // Every page must still resolve through the copied graph.
    for (_number, page_id) in rebuilt.get_pages() {
        rebuilt.get_object(page_id)?;
    }

    rebuilt.renumber_objects();
    Ok(rebuilt)
}
