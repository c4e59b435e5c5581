use actix_files::{Files, NamedFile};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::TryStreamExt;
use log::{error, info};
use std::path::PathBuf;
use uuid::Uuid;

use crate::classifier::{self, Classifier};
use crate::error::ApiError;

const UPLOAD_FIELD: &str = "file";

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: PathBuf) {
    let index_path = static_dir.join("index.html");

    cfg.service(web::resource("/").route(web::get().to(move || {
        let index_path = index_path.clone();
        async move { NamedFile::open_async(index_path).await }
    })))
    .service(web::resource("/predict").route(web::post().to(handle_predict)))
    .service(Files::new("/static", static_dir));
}

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// Returns the first part named `file` that carries a filename. Parts without
/// a filename are plain form fields and are skipped.
async fn read_upload(mut payload: Multipart) -> Result<Upload, ApiError> {
    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition();
        let is_upload_field = disposition.and_then(|cd| cd.get_name()) == Some(UPLOAD_FIELD);
        let file_name = disposition
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let Some(file_name) = file_name.filter(|_| is_upload_field) else {
            while field.try_next().await?.is_some() {}
            continue;
        };

        if file_name.is_empty() {
            return Err(ApiError::NoSelectedFile);
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            data.extend_from_slice(&chunk);
        }
        return Ok(Upload { file_name, data });
    }

    Err(ApiError::NoFilePart)
}

async fn handle_predict(
    classifier: web::Data<dyn Classifier>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let upload = read_upload(payload).await.inspect_err(|e| {
        info!("[{}] Rejected upload: {}", request_id, e);
    })?;
    info!(
        "[{}] Classifying {} ({} bytes)",
        request_id,
        upload.file_name,
        upload.data.len()
    );

    let model = classifier.into_inner();
    let result = web::block(move || {
        classifier::predict(model.as_ref(), &upload.data)?.into_response()
    })
    .await?;

    match result {
        Ok(response) => {
            info!(
                "[{}] Predicted {} ({:.2}%)",
                request_id, response.prediction, response.confidence
            );
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("[{}] Prediction failed: {}", request_id, e);
            Err(e.into())
        }
    }
}
