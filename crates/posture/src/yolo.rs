//! YOLOv8 person detector running an ONNX export through tract

use crate::detection::{BoundingBox, Detection};
use crate::{FrameClassifier, PostureConfig, PostureError};
use camera_capture::VideoFrame;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use tract_onnx::prelude::*;
use tracing::{debug, info};

type YoloPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorbike", "aeroplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "sofa",
    "pottedplant", "bed", "diningtable", "toilet", "tvmonitor", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

const PAD_GREY: Rgb<u8> = Rgb([114, 114, 114]);

/// Placement of a frame inside the square model input: uniform scale, then
/// centered with grey padding on the short side
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    /// Map a model-space `cx, cy, w, h` box back onto the frame, clamped to it
    fn to_frame(&self, (cx, cy, w, h): (f32, f32, f32, f32), width: u32, height: u32) -> [f32; 4] {
        let x = |v: f32| ((v - self.pad_x) / self.scale).clamp(0.0, width as f32);
        let y = |v: f32| ((v - self.pad_y) / self.scale).clamp(0.0, height as f32);
        [
            x(cx - w / 2.0),
            y(cy - h / 2.0),
            x(cx + w / 2.0),
            y(cy + h / 2.0),
        ]
    }
}

/// Resize keeping the aspect ratio and pad to `size`x`size`
fn letterbox(img: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (width, height) = img.dimensions();
    let scale = size as f32 / width.max(height).max(1) as f32;
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);
    let resized = image::imageops::resize(img, new_width, new_height, FilterType::Triangle);

    let pad_x = (size - new_width) / 2;
    let pad_y = (size - new_height) / 2;
    let mut canvas = RgbImage::from_pixel(size, size, PAD_GREY);
    image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    (
        canvas,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

/// Raw candidate in frame coordinates, before NMS
#[derive(Debug, Clone)]
struct Candidate {
    class_id: usize,
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        let intersection = if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        };
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// YOLOv8 classifier
pub struct YoloClassifier {
    plan: YoloPlan,
    labels: Vec<String>,
    input_size: u32,
    score_floor: f32,
    nms_iou: f32,
}

impl YoloClassifier {
    /// Load the model named by `config.model_path`
    pub fn new(config: &PostureConfig) -> Result<Self, PostureError> {
        let path = config
            .model_path
            .as_deref()
            .ok_or_else(|| PostureError::ModelLoad("no model path configured".to_string()))?;
        info!("Loading YOLO model from {}", path);

        let size = config.input_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| PostureError::ModelLoad(format!("{}: {}", path, e)))?;

        let labels = match &config.labels_path {
            Some(labels_path) => load_labels(labels_path)?,
            None => COCO_LABELS.iter().map(|l| l.to_string()).collect(),
        };

        Ok(Self {
            plan,
            labels,
            input_size: config.input_size,
            score_floor: config.score_floor,
            nms_iou: config.nms_iou,
        })
    }

    fn label(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

impl FrameClassifier for YoloClassifier {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, PostureError> {
        let size = self.input_size;
        let img = frame.to_rgb_image()?;
        let (input_img, placement) = letterbox(&img, size);

        let input: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, c, y, x)| input_img.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        )
        .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| PostureError::Inference(e.to_string()))?;
        let output = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| PostureError::Inference(e.to_string()))?;

        // [1, 4 + classes, anchors]
        let shape = output.shape().to_vec();
        if shape.len() != 3 || shape[1] <= 4 {
            return Err(PostureError::Inference(format!(
                "unexpected output shape {:?}",
                shape
            )));
        }
        let view = output.index_axis(tract_ndarray::Axis(0), 0);

        let mut candidates = Vec::new();
        for anchor in 0..shape[2] {
            let mut best = (0usize, f32::MIN);
            for class_id in 0..(shape[1] - 4) {
                let score = view[[4 + class_id, anchor]];
                if score > best.1 {
                    best = (class_id, score);
                }
            }
            if best.1 < self.score_floor {
                continue;
            }

            let [x1, y1, x2, y2] = placement.to_frame(
                (
                    view[[0, anchor]],
                    view[[1, anchor]],
                    view[[2, anchor]],
                    view[[3, anchor]],
                ),
                frame.width,
                frame.height,
            );
            candidates.push(Candidate {
                class_id: best.0,
                score: best.1,
                x1,
                y1,
                x2,
                y2,
            });
        }

        let kept = nms(candidates, self.nms_iou);
        debug!("Frame {}: {} detections after NMS", frame.sequence, kept.len());

        Ok(kept
            .into_iter()
            .map(|c| {
                Detection::new(
                    BoundingBox::new(c.x1 as i32, c.y1 as i32, c.x2 as i32, c.y2 as i32),
                    self.label(c.class_id),
                    to_percent(c.score),
                )
            })
            .collect())
    }
}

/// Model scores are 0-1; detections carry whole percent, rounded up
fn to_percent(score: f32) -> f32 {
    (score * 100.0).ceil()
}

fn load_labels(path: &str) -> Result<Vec<String>, PostureError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PostureError::ModelLoad(format!("{}: {}", path, e)))?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}

/// Per-class non-maximum suppression, highest score first
fn nms(candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    let mut by_class: HashMap<usize, Vec<Candidate>> = HashMap::new();
    for candidate in candidates {
        by_class.entry(candidate.class_id).or_default().push(candidate);
    }

    let mut kept = Vec::new();
    for (_, mut group) in by_class {
        group.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..group.len() {
                if !suppressed[j] && group[i].iou(&group[j]) > iou_threshold {
                    suppressed[j] = true;
                }
            }
            kept.push(group[i].clone());
        }
    }
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept
}
