pub mod attendance;
pub mod core;
pub mod courses;
pub mod marks;
pub mod records;
pub mod students;
pub mod users;

use axum::extract::Multipart;

use super::error::{ApiError, ApiResult};
use super::extract::required;

/// Parts of a bulk upload form: the CSV file plus the semester applied to every row.
pub(crate) struct UploadForm {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub semester: String,
}

pub(crate) async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut semester: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field.bytes().await?;
                file = Some((name, bytes.to_vec()));
            }
            Some("semester") => {
                semester = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(ApiError::bad_params("No file uploaded"));
    };
    let semester = required(semester, "semester")?;
    Ok(UploadForm {
        file_name,
        bytes,
        semester,
    })
}
