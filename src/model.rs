use std::fmt;
use std::fs::File;
use std::io::Read;

use image::imageops::FilterType;
use serde::Serialize;
use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};

const INPUT_SIZE: u32 = 128;

/// The two device categories the classifier distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Smartphone,
    Laptop,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Smartphone => "smartphone",
            DeviceKind::Laptop => "laptop",
        }
    }

    /// Decision rule over the classifier's scalar output.
    pub fn from_score(score: f32) -> Self {
        if score > 0.5 {
            DeviceKind::Smartphone
        } else {
            DeviceKind::Laptop
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Model {
    session: Session,
    graph: Graph,
}

impl Model {
    pub fn new(model_path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut graph = Graph::new();
        let mut model_file = File::open(model_path)?;
        let mut model_bytes = Vec::new();
        model_file.read_to_end(&mut model_bytes)?;

        graph.import_graph_def(&model_bytes, &ImportGraphDefOptions::new())?;

        let session = Session::new(&SessionOptions::new(), &graph)?;

        Ok(Model { session, graph })
    }

    fn preprocess_image(
        &self,
        image_data: &[u8],
    ) -> Result<Tensor<f32>, Box<dyn std::error::Error + Send + Sync>> {
        let img = image::load_from_memory(image_data)?;
        let rgb = img
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
            .to_rgb8();

        // Channel values scaled to [0, 1], NHWC layout.
        let mut flat_img = Vec::with_capacity((INPUT_SIZE * INPUT_SIZE * 3) as usize);
        for pixel in rgb.pixels() {
            flat_img.push(pixel[0] as f32 / 255.0);
            flat_img.push(pixel[1] as f32 / 255.0);
            flat_img.push(pixel[2] as f32 / 255.0);
        }

        let mut tensor = Tensor::new(&[1, INPUT_SIZE as u64, INPUT_SIZE as u64, 3]);
        tensor.copy_from_slice(&flat_img);

        Ok(tensor)
    }

    /// Single forward pass; the graph outputs one sigmoid score.
    pub fn predict(
        &self,
        image_data: &[u8],
    ) -> Result<DeviceKind, Box<dyn std::error::Error + Send + Sync>> {
        let input_tensor = self.preprocess_image(image_data)?;

        let mut args = SessionRunArgs::new();

        let input_operation = self
            .graph
            .operation_by_name("x")
            .map_err(|_| "Failed to retrieve input operation")?
            .ok_or("Input operation 'x:0' not found in graph")?;

        let output_operation = self
            .graph
            .operation_by_name("Identity")
            .map_err(|_| "Failed to retrieve output operation")?
            .ok_or("Output operation 'Identity:0' not found in graph")?;

        args.add_feed(&input_operation, 0, &input_tensor);
        let output_token = args.request_fetch(&output_operation, 0);
        self.session.run(&mut args)?;
        let output_tensor: Tensor<f32> = args.fetch(output_token)?;

        let score = output_tensor
            .to_vec()
            .first()
            .copied()
            .ok_or("Model produced no output")?;

        Ok(DeviceKind::from_score(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_above_half_is_smartphone() {
        assert_eq!(DeviceKind::from_score(0.51), DeviceKind::Smartphone);
        assert_eq!(DeviceKind::from_score(1.0), DeviceKind::Smartphone);
    }

    #[test]
    fn score_at_or_below_half_is_laptop() {
        assert_eq!(DeviceKind::from_score(0.5), DeviceKind::Laptop);
        assert_eq!(DeviceKind::from_score(0.0), DeviceKind::Laptop);
    }

    #[test]
    fn serializes_to_lowercase_label() {
        assert_eq!(
            serde_json::to_string(&DeviceKind::Smartphone).unwrap(),
            "\"smartphone\""
        );
        assert_eq!(
            serde_json::to_string(&DeviceKind::Laptop).unwrap(),
            "\"laptop\""
        );
    }

    #[test]
    fn display_matches_label() {
        assert_eq!(DeviceKind::Smartphone.to_string(), "smartphone");
        assert_eq!(DeviceKind::Laptop.to_string(), "laptop");
    }
}
