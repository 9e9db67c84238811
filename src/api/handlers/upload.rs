use crate::AppState;
use crate::api::error::AppError;
use crate::config::upload_profile;
use crate::models::{FieldValue, FileItem, TransportStatus, UploadOutcome};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;

/// Multipart body: one or more file parts. Parts sharing a name form one
/// field; a name ending in `[]` is always treated as a list.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: String,
}

#[utoipa::path(
    post,
    path = "/upload/{profile}",
    params(
        ("profile" = String, Path, description = "Upload profile configured under uploads.profiles")
    ),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-field, per-file intake outcome", body = UploadOutcome),
        (status = 404, description = "Unknown upload profile"),
        (status = 413, description = "Request body too large")
    ),
    tag = "uploads"
)]
pub async fn upload_files(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, AppError> {
    let result: Result<Json<UploadOutcome>, AppError> = async {
        let options = upload_profile(state.resolver.as_ref(), &profile)
            .map_err(|e| AppError::Internal(format!("Invalid upload profile '{}': {}", profile, e)))?
            .ok_or_else(|| AppError::NotFound(format!("Unknown upload profile '{}'", profile)))?;

        let max_file_size = state.config.max_file_size as u64;
        let mut spooled = SpooledFields::default();

        loop {
            let mut field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                // Keep what already arrived; the interrupted part is marked partial
                Err(e) if !spooled.is_empty() => {
                    tracing::warn!("Multipart stream ended early: {}", e);
                    break;
                }
                Err(e) => return Err(multipart_error(e)),
            };

            let Some(name) = field.name().map(str::to_string) else {
                drain(&mut field).await;
                continue;
            };
            let Some(file_name) = field.file_name().map(str::to_string) else {
                tracing::debug!(field = %name, "Ignoring non-file form part");
                drain(&mut field).await;
                continue;
            };

            let file = spool(&mut field, file_name, max_file_size).await;
            spooled.push(&name, file);
        }

        let (fields, temps) = spooled.into_parts();
        let intake = state.intake.clone();
        let outcome = tokio::task::spawn_blocking(move || intake.process(fields, &options))
            .await
            .map_err(|e| AppError::Internal(format!("Intake task failed: {}", e)))?;

        // Whatever was not moved into place is removed here
        drop(temps);

        Ok(Json(outcome))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Consume the rest of the body so the client is not cut off mid-send
            tracing::warn!("Upload failed early: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                drain(&mut field).await;
            }
            Err(e)
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

async fn drain(field: &mut Field<'_>) {
    while let Ok(Some(_)) = field.chunk().await {}
}

struct SpooledFile {
    item: FileItem,
    temp: Option<TempPath>,
}

/// Writes one file part to a temporary file, recording how the transfer went
/// as the item's transport status.
async fn spool(field: &mut Field<'_>, original_name: String, max_size: u64) -> SpooledFile {
    let (file, temp) = match tempfile::Builder::new().prefix("intake-").tempfile() {
        Ok(named) => named.into_parts(),
        Err(e) => {
            tracing::error!("Failed to create temp file for '{}': {}", original_name, e);
            drain(field).await;
            return SpooledFile {
                item: FileItem::new(original_name, 0, std::path::PathBuf::new())
                    .with_status(TransportStatus::Failed),
                temp: None,
            };
        }
    };

    let mut file = tokio::fs::File::from_std(file);
    let mut size: u64 = 0;
    let mut status = TransportStatus::Ok;

    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                size += chunk.len() as u64;
                if !status.is_ok() {
                    continue;
                }
                if size > max_size {
                    status = TransportStatus::SizeExceeded;
                    continue;
                }
                if let Err(e) = file.write_all(&chunk).await {
                    tracing::error!("Failed to spool '{}': {}", original_name, e);
                    status = TransportStatus::Failed;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Upload of '{}' interrupted: {}", original_name, e);
                status = TransportStatus::Partial;
                break;
            }
        }
    }

    if status.is_ok() {
        if let Err(e) = file.flush().await {
            tracing::error!("Failed to flush '{}': {}", original_name, e);
            status = TransportStatus::Failed;
        }
    }
    if status.is_ok() && original_name.is_empty() && size == 0 {
        status = TransportStatus::NoFile;
    }

    SpooledFile {
        item: FileItem::new(original_name, size, temp.to_path_buf()).with_status(status),
        temp: Some(temp),
    }
}

/// Groups spooled parts by field name in first-seen order
#[derive(Default)]
struct SpooledFields {
    fields: Vec<(String, bool, Vec<FileItem>)>,
    temps: Vec<TempPath>,
}

impl SpooledFields {
    fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, raw_name: &str, file: SpooledFile) {
        let (name, is_list) = match raw_name.strip_suffix("[]") {
            Some(name) => (name, true),
            None => (raw_name, false),
        };

        match self.fields.iter_mut().find(|(n, _, _)| n == name) {
            Some((_, list, items)) => {
                *list |= is_list;
                items.push(file.item);
            }
            None => self
                .fields
                .push((name.to_string(), is_list, vec![file.item])),
        }
        self.temps.extend(file.temp);
    }

    fn into_parts(self) -> (Vec<(String, FieldValue)>, Vec<TempPath>) {
        let fields = self
            .fields
            .into_iter()
            .map(|(name, is_list, mut items)| {
                let value = if !is_list && items.len() == 1 {
                    FieldValue::One(items.remove(0))
                } else {
                    FieldValue::Many(items)
                };
                (name, value)
            })
            .collect();
        (fields, self.temps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spooled(name: &str) -> SpooledFile {
        SpooledFile {
            item: FileItem::new(name, 1, "/tmp/x"),
            temp: None,
        }
    }

    #[test]
    fn test_parts_grouped_by_name() {
        let mut fields = SpooledFields::default();
        fields.push("avatar", spooled("a.png"));
        fields.push("docs", spooled("1.pdf"));
        fields.push("docs", spooled("2.pdf"));
        fields.push("gallery[]", spooled("g.jpg"));

        let (parts, temps) = fields.into_parts();
        assert!(temps.is_empty());
        assert_eq!(parts.len(), 3);

        assert_eq!(parts[0].0, "avatar");
        assert!(matches!(parts[0].1, FieldValue::One(_)));

        assert_eq!(parts[1].0, "docs");
        match &parts[1].1 {
            FieldValue::Many(items) => {
                let names: Vec<_> = items.iter().map(|i| i.original_name.as_str()).collect();
                assert_eq!(names, ["1.pdf", "2.pdf"]);
            }
            other => panic!("expected a list, got {:?}", other),
        }

        assert_eq!(parts[2].0, "gallery");
        assert!(matches!(&parts[2].1, FieldValue::Many(items) if items.len() == 1));
    }
}
