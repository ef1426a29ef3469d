//! Dispatcher for chained transform operations
//!
//! Walks a parsed `OperationChain` left to right, resolving each operation
//! name against a registry of transform functions. Every step either fully
//! replaces the working buffer or fails; the first failure aborts the rest
//! of the chain and the buffer from earlier steps is discarded.

use crate::compression::{FormatSpec, QualitySpec};
use crate::image::blind::{validate_extract_operation, BlindWatermarkSpec};
use crate::image::filters::{grayscale, BlurSpec};
use crate::image::{
    AutoOrientSpec, CropSpec, ResizeSpec, RotateSpec, WatermarkAssets, WatermarkSpec,
};
use bytes::Bytes;
use mediaforge_core::{Operation, OperationChain, TransformError};
use std::collections::HashMap;
use std::sync::Arc;

/// A single registered transform: bytes in, bytes out.
pub type TransformFn =
    Box<dyn Fn(&[u8], &Operation) -> Result<Bytes, TransformError> + Send + Sync>;

/// Opaque external transform for blind-watermark embedding/extraction.
/// The algorithm lives outside the core; parameters are validated here
/// before the callable ever sees them.
pub type BlindEmbedFn =
    Box<dyn Fn(&[u8], &BlindWatermarkSpec) -> anyhow::Result<Bytes> + Send + Sync>;
pub type BlindExtractFn = Box<dyn Fn(&[u8]) -> anyhow::Result<Bytes> + Send + Sync>;

/// Maps operation names to transform functions.
#[derive(Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, transform: TransformFn) {
        self.transforms.insert(name.into(), transform);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    /// Register an external blind-watermark embedder under `blindwatermark`.
    pub fn register_blind_watermark(&mut self, embed: BlindEmbedFn) {
        self.register(
            "blindwatermark",
            Box::new(move |data, op| {
                let spec = BlindWatermarkSpec::from_operation(op)?;
                embed(data, &spec).map_err(TransformError::from)
            }),
        );
    }

    /// Register an external blind-watermark extractor under `deblindwatermark`.
    pub fn register_deblind_watermark(&mut self, extract: BlindExtractFn) {
        self.register(
            "deblindwatermark",
            Box::new(move |data, op| {
                validate_extract_operation(op)?;
                extract(data).map_err(TransformError::from)
            }),
        );
    }
}

/// Build the registry of built-in image transforms.
///
/// `assets` carries the externally resolved watermark resources;
/// `default_jpeg_quality` feeds the relative-quality cap.
pub fn image_registry(assets: WatermarkAssets, default_jpeg_quality: u8) -> TransformRegistry {
    let assets = Arc::new(assets);
    let mut registry = TransformRegistry::new();

    registry.register(
        "auto-orient",
        Box::new(|data, op| AutoOrientSpec::from_operation(op)?.apply(data)),
    );
    registry.register(
        "resize",
        Box::new(|data, op| ResizeSpec::from_operation(op)?.apply(data)),
    );
    registry.register(
        "crop",
        Box::new(|data, op| CropSpec::from_operation(op)?.apply(data)),
    );
    let wm_assets = Arc::clone(&assets);
    registry.register(
        "watermark",
        Box::new(move |data, op| WatermarkSpec::from_operation(op)?.apply(data, &wm_assets)),
    );
    registry.register(
        "format",
        Box::new(|data, op| FormatSpec::from_operation(op)?.apply(data)),
    );
    registry.register(
        "quality",
        Box::new(move |data, op| {
            QualitySpec::from_operation(op)?.apply(data, default_jpeg_quality)
        }),
    );
    registry.register(
        "rotate",
        Box::new(|data, op| RotateSpec::from_operation(op)?.apply(data)),
    );
    registry.register(
        "blur",
        Box::new(|data, op| BlurSpec::from_operation(op)?.apply(data)),
    );
    registry.register("grayscale", Box::new(grayscale));

    registry
}

/// Apply every operation in the chain in order. Each operation is atomic:
/// on error the partially transformed buffer is dropped and the error is
/// surfaced unchanged.
pub fn apply_chain(
    data: &[u8],
    chain: &OperationChain,
    registry: &TransformRegistry,
) -> Result<Bytes, TransformError> {
    let mut current = Bytes::copy_from_slice(data);

    for op in chain {
        let transform = registry
            .get(op.name())
            .ok_or_else(|| TransformError::UnknownOperation(op.name().to_string()))?;

        tracing::debug!(operation = op.name(), "applying operation");
        current = transform(&current, op)?;
    }

    Ok(current)
}
