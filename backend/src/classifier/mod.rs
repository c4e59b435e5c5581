pub mod info;
pub mod model;
pub mod preprocess;

use shared::{PredictionResponse, TumorClass};
use strum::EnumCount;

pub use model::{Classifier, InferenceError, TorchClassifier};
use preprocess::{decode_image, preprocess_image};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class: TumorClass,
    /// Highest class probability, in percent.
    pub confidence: f64,
}

impl Prediction {
    /// Picks the arg-max class. Ties go to the lower index.
    pub fn from_scores(scores: &[f32]) -> Result<Self, InferenceError> {
        if scores.len() != TumorClass::COUNT {
            return Err(InferenceError::OutputShape {
                expected: TumorClass::COUNT,
                actual: scores.len(),
            });
        }
        if scores.iter().any(|score| !score.is_finite()) {
            return Err(InferenceError::NonFinite);
        }

        let (index, max_score) = scores.iter().copied().enumerate().fold(
            (0, f32::NEG_INFINITY),
            |best, (i, score)| if score > best.1 { (i, score) } else { best },
        );
        let class = TumorClass::from_index(index).ok_or(InferenceError::OutputShape {
            expected: TumorClass::COUNT,
            actual: scores.len(),
        })?;

        Ok(Self {
            class,
            confidence: f64::from(max_score) * 100.0,
        })
    }

    pub fn into_response(self) -> Result<PredictionResponse, InferenceError> {
        let entry = info::lookup(self.class)
            .ok_or_else(|| InferenceError::MissingInfo(self.class.as_ref().to_string()))?;

        Ok(PredictionResponse {
            prediction: self.class.display_name(),
            confidence: self.confidence,
            specialist: entry.specialist.to_string(),
            info: entry.info.to_string(),
        })
    }
}

/// Runs one uploaded image through decode, preprocessing and the model.
pub fn predict(
    classifier: &dyn Classifier,
    image_bytes: &[u8],
) -> Result<Prediction, InferenceError> {
    let image = decode_image(image_bytes)?;
    let input = preprocess_image(&image);
    let scores = classifier.forward(&input)?;
    Prediction::from_scores(&scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use ndarray::Array4;
    use std::io::Cursor;

    struct FixedScores(Vec<f32>);

    impl Classifier for FixedScores {
        fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(input.shape(), &[1, 150, 150, 3]);
            Ok(self.0.clone())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([90, 90, 90]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn picks_highest_score() {
        let prediction = Prediction::from_scores(&[0.1, 0.2, 0.05, 0.65]).unwrap();
        assert_eq!(prediction.class, TumorClass::PituitaryTumor);
        assert!((prediction.confidence - 65.0).abs() < 1e-4);
    }

    #[test]
    fn ties_resolve_to_first_class() {
        let prediction = Prediction::from_scores(&[0.4, 0.4, 0.1, 0.1]).unwrap();
        assert_eq!(prediction.class, TumorClass::GliomaTumor);
    }

    #[test]
    fn confidence_spans_zero_to_hundred() {
        let certain = Prediction::from_scores(&[0.0, 1.0, 0.0, 0.0]).unwrap();
        assert_eq!(certain.class, TumorClass::MeningiomaTumor);
        assert_eq!(certain.confidence, 100.0);

        let uniform = Prediction::from_scores(&[0.25; 4]).unwrap();
        assert_eq!(uniform.confidence, 25.0);
    }

    #[test]
    fn rejects_wrong_number_of_scores() {
        let err = Prediction::from_scores(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::OutputShape {
                expected: 4,
                actual: 2
            }
        ));
        assert!(Prediction::from_scores(&[]).is_err());
    }

    #[test]
    fn rejects_non_finite_scores() {
        let err = Prediction::from_scores(&[0.1, f32::NAN, 0.2, 0.3]).unwrap_err();
        assert!(matches!(err, InferenceError::NonFinite));
    }

    #[test]
    fn response_carries_title_cased_label_and_info() {
        let response = Prediction {
            class: TumorClass::NoTumor,
            confidence: 87.5,
        }
        .into_response()
        .unwrap();

        assert_eq!(response.prediction, "No Tumor");
        assert_eq!(response.confidence, 87.5);
        assert_eq!(response.specialist, "N/A");
        assert!(response.info.starts_with("The model did not detect a tumor."));
    }

    #[test]
    fn predict_runs_the_full_pipeline() {
        let classifier = FixedScores(vec![0.05, 0.8, 0.1, 0.05]);
        let prediction = predict(&classifier, &png(320, 240)).unwrap();
        assert_eq!(prediction.class, TumorClass::MeningiomaTumor);
        assert!((prediction.confidence - 80.0).abs() < 1e-4);
    }

    #[test]
    fn predict_surfaces_decode_errors_before_inference() {
        let classifier = FixedScores(vec![]);
        let err = predict(&classifier, b"GIF89a-but-truncated").unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }
}
