//! Provide Waste Classification
//!
//! Every back-end answers with a category number (1: Rubbish, 2: Recyclable,
//! 3: Organics, 4: Ecowaste). Numbers outside that range are passed through so the
//! workflow can report them.

use std::path::Path;
use std::sync::Arc;

use crate::module::util::conf;
use crate::BoxError;

/// Maps a captured image to a category number.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &Path) -> Result<u8, BoxError>;
}

/// Classifier back-ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Kinds {
    Random,
    Http,
    Onnx,
    Unknown,
}

impl Kinds {
    /// Convert an string to a back-end kind.
    pub fn from_string(s: &str) -> Kinds {
        match s {
            "random" => Kinds::Random,
            "http" => Kinds::Http,
            "onnx" => Kinds::Onnx,
            _ => Kinds::Unknown,
        }
    }
}

/// Build the configured classifier.
pub fn build(conf: &conf::Classifier) -> Result<Arc<dyn Classifier>, BoxError> {
    let classifier: Arc<dyn Classifier> = match Kinds::from_string(&conf.kind) {
        Kinds::Random => Arc::new(stub::RandomClassifier::new(conf.delay_ms)),
        Kinds::Http => Arc::new(http::HttpClassifier::new(&conf.endpoint)?),
        Kinds::Onnx => Arc::new(onnx::OnnxClassifier::new(&conf.model, conf.input_size)?),
        Kinds::Unknown => return Err(format!("Unknown classifier kind {:?}", conf.kind).into()),
    };
    log::info!("Classifier: {}", conf.kind);
    Ok(classifier)
}

/// Read a category from a textual answer: either its number or its name.
pub fn parse_answer(answer: &str) -> Result<u8, BoxError> {
    let answer = answer.trim();
    if let Ok(n) = answer.parse::<u8>() {
        return Ok(n);
    }
    match super::Category::from_name(answer) {
        Some(c) => Ok(c.to_u8()),
        None => Err(format!("Unreadable classifier answer {:?}", answer).into()),
    }
}

pub mod stub {
    //! Stand-in until a real model is deployed.

    use rand::Rng;
    use std::path::Path;
    use std::{thread, time};

    use crate::BoxError;

    /// Waits a fixed time and answers a uniformly random category.
    pub struct RandomClassifier {
        delay: time::Duration,
    }

    impl RandomClassifier {
        pub fn new(delay_ms: u64) -> Self {
            Self {
                delay: time::Duration::from_millis(delay_ms),
            }
        }
    }

    impl super::Classifier for RandomClassifier {
        fn classify(&self, image: &Path) -> Result<u8, BoxError> {
            log::debug!("Simulating classification of {}", image.display());
            thread::sleep(self.delay); // Simulate processing time
            Ok(rand::thread_rng().gen_range(1..=4))
        }
    }
}

pub mod http {
    //! Remote inference endpoint.

    use reqwest::blocking::{multipart::Form, Client};
    use std::path::Path;

    use crate::BoxError;

    /// Posts the image as `multipart/form-data` (field `imageFile`) and reads the
    /// category from the response body.
    pub struct HttpClassifier {
        url: String,
        client: Client,
    }

    impl HttpClassifier {
        pub fn new(url: &str) -> Result<Self, BoxError> {
            Ok(Self {
                url: url.to_string(),
                client: Client::builder().build()?,
            })
        }
    }

    impl super::Classifier for HttpClassifier {
        fn classify(&self, image: &Path) -> Result<u8, BoxError> {
            let form = Form::new().file("imageFile", image)?;
            let res = self
                .client
                .post(&self.url)
                .multipart(form)
                .send()?
                .error_for_status()?;
            let body = res.text()?;
            log::debug!("Classifier endpoint answered {:?}", body);
            super::parse_answer(&body)
        }
    }
}

pub mod onnx {
    //! Local ONNX image classifier.

    use image::{imageops::FilterType, ImageBuffer, Pixel, Rgb};
    use ort::{
        environment::Environment, value::Value, ExecutionProvider, GraphOptimizationLevel,
        LoggingLevel, Session, SessionBuilder,
    };
    use std::path::Path;
    use std::sync::Mutex;

    use crate::module::util::common::lock;
    use crate::BoxError;

    /// Square-input classifier whose first output holds one score per category.
    pub struct OnnxClassifier {
        session: Mutex<Session>,
        imgsz: u32,
    }

    impl OnnxClassifier {
        pub fn new(model_path: &str, imgsz: u32) -> Result<Self, BoxError> {
            let session = Self::get_session("waste_classifier", model_path)
                .map_err(|e| format!("Can't load {}: {}", model_path, e))?;
            Ok(Self {
                session: Mutex::new(session),
                imgsz,
            })
        }

        /// get session
        ///
        fn get_session(name: &str, model_path: &str) -> Result<Session, Box<dyn std::error::Error>> {
            let environment = Environment::builder()
                .with_name(name)
                .with_log_level(LoggingLevel::Warning)
                .with_execution_providers([ExecutionProvider::CPU(Default::default())])
                .build()?
                .into_arc();
            let session = SessionBuilder::new(&environment)?
                .with_optimization_level(GraphOptimizationLevel::Level1)?
                .with_intra_threads(4)?
                .with_model_from_file(model_path)?;
            Ok(session)
        }

        /// Infer
        ///
        fn infer(&self, impath: &Path) -> Result<u8, Box<dyn std::error::Error>> {
            let sz = self.imgsz;
            // Load image and resize to model's shape, converting to RGB format
            let img: ImageBuffer<Rgb<u8>, Vec<u8>> = image::open(impath)?
                .resize_exact(sz, sz, FilterType::Nearest)
                .to_rgb8();

            let array = ndarray::CowArray::from(
                ndarray::Array::from_shape_fn((1, 3, sz as usize, sz as usize), |(_, c, j, i)| {
                    let pixel = img.get_pixel(i as u32, j as u32);
                    let channels = pixel.channels();
                    // range [0, 255] -> range [0, 1]
                    (channels[c] as f32) / 255.0
                })
                .into_dyn(),
            );

            let session = lock(&self.session);
            let tensor = vec![Value::from_array(session.allocator(), &array)?];
            let outs = session.run(tensor)?;
            let out = outs.get(0).ok_or("model produced no output")?.try_extract::<f32>()?;
            let scores: Vec<f32> = out.view().iter().copied().collect();
            let index = argmax(&scores).ok_or("model produced empty scores")?;
            Ok(category_number(index).map_err(|e| e.to_string())?)
        }
    }

    impl super::Classifier for OnnxClassifier {
        fn classify(&self, image: &Path) -> Result<u8, BoxError> {
            self.infer(image).map_err(|e| e.to_string().into())
        }
    }

    /// Category number of output `index` (class 0 is category 1).
    pub fn category_number(index: usize) -> Result<u8, BoxError> {
        index
            .checked_add(1)
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| format!("model output index {} is out of range", index).into())
    }

    /// Index of the highest score.
    pub fn argmax(scores: &[f32]) -> Option<usize> {
        scores
            .iter()
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_from_string() {
        assert_eq!(Kinds::from_string("random"), Kinds::Random);
        assert_eq!(Kinds::from_string("http"), Kinds::Http);
        assert_eq!(Kinds::from_string("onnx"), Kinds::Onnx);
        assert_eq!(Kinds::from_string("magic"), Kinds::Unknown);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut conf = conf::toml::defaults().unwrap().classifier;
        conf.kind = "magic".to_string();
        assert!(build(&conf).is_err());
    }

    #[test]
    fn stub_answers_a_known_category() {
        let stub = stub::RandomClassifier::new(0);
        for _ in 0..50 {
            let n = stub.classify(Path::new("/tmp/none.jpg")).unwrap();
            assert!(crate::module::vision::Category::from_u8(n).is_some());
        }
    }

    #[test]
    fn answers_parse_as_number_or_name() {
        assert_eq!(parse_answer("3\n").unwrap(), 3);
        assert_eq!(parse_answer("Ecowaste").unwrap(), 4);
        assert_eq!(parse_answer("9").unwrap(), 9);
        assert!(parse_answer("banana").is_err());
    }

    #[test]
    fn argmax_picks_highest_score() {
        assert_eq!(onnx::argmax(&[0.1, 0.7, 0.2, 0.0]), Some(1));
        assert_eq!(onnx::argmax(&[]), None);
    }

    #[test]
    fn wide_model_outputs_are_rejected() {
        assert_eq!(onnx::category_number(0).unwrap(), 1);
        assert_eq!(onnx::category_number(254).unwrap(), 255);
        assert!(onnx::category_number(255).is_err());
        assert!(onnx::category_number(256).is_err());
        assert!(onnx::category_number(usize::MAX).is_err());
    }
}
