//! Build the built-in filters from JSON configuration.
//!
//! ```json
//! [
//!   { "kind": "blur", "params": { "strength": 4, "quality": 2 } },
//!   { "kind": "color_matrix", "params": { "preset": "sepia", "amount": 0.8 },
//!     "settings": { "resolution": 0.5 } }
//! ]
//! ```

use std::rc::Rc;

use crate::effects::{
    AlphaFilter, BlendModeFilter, BlurFilter, ColorMatrix, ColorMatrixFilter, ColorPreset,
    CompositeMode,
};
use crate::filter::{Antialias, BlendMode, Filter, FilterState, Resolution, validate_settings};
use crate::foundation::error::{FxError, FxResult};

/// Kinds understood by [`parse_filter`], in their canonical spelling.
pub const BUILTIN_KINDS: &[&str] = &["alpha", "blur", "color_matrix", "blend_mode"];

/// One filter in a configuration file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterSpec {
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub settings: SettingsOverride,
}

impl FilterSpec {
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            params,
            settings: SettingsOverride::default(),
        }
    }
}

/// Settings applied on top of a built filter's own defaults. Absent fields keep the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsOverride {
    pub padding: Option<f64>,
    pub resolution: Option<Resolution>,
    pub antialias: Option<Antialias>,
    pub blend_mode: Option<BlendMode>,
    pub enabled: Option<bool>,
    pub clip_to_viewport: Option<bool>,
}

impl SettingsOverride {
    fn apply(&self, state: &FilterState) -> FxResult<()> {
        let mut settings = state.get();
        if let Some(v) = self.padding {
            settings.padding = v;
        }
        if let Some(v) = self.resolution {
            settings.resolution = v;
        }
        if let Some(v) = self.antialias {
            settings.antialias = v;
        }
        if let Some(v) = self.blend_mode {
            settings.blend_mode = v;
        }
        if let Some(v) = self.enabled {
            settings.enabled = v;
        }
        if let Some(v) = self.clip_to_viewport {
            settings.clip_to_viewport = v;
        }
        validate_settings(&settings)?;
        state.set(settings);
        Ok(())
    }
}

pub fn parse_filter(spec: &FilterSpec) -> FxResult<Rc<dyn Filter>> {
    let kind = spec.kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(FxError::validation("filter kind must be non-empty"));
    }
    let params = &spec.params;

    match kind.as_str() {
        "alpha" => {
            let alpha = get_f32(params, "alpha")?;
            if !(0.0..=1.0).contains(&alpha) {
                return Err(FxError::validation("alpha must be within 0..=1"));
            }
            let filter = AlphaFilter::new(alpha);
            spec.settings.apply(filter.state())?;
            Ok(Rc::new(filter))
        }
        "blur" => {
            let strength = opt_f32(params, "strength")?.unwrap_or(8.0);
            let x = opt_f32(params, "strength_x")?.unwrap_or(strength);
            let y = opt_f32(params, "strength_y")?.unwrap_or(strength);
            let quality = opt_u32(params, "quality")?.unwrap_or(4);
            if quality == 0 {
                return Err(FxError::validation("blur quality must be >= 1"));
            }
            let kernel_size = opt_u32(params, "kernel_size")?.unwrap_or(5);
            let filter = BlurFilter::with_axes(x, y, quality, kernel_size)?;
            spec.settings.apply(filter.state())?;
            Ok(Rc::new(filter))
        }
        "colormatrix" | "color_matrix" | "color-matrix" => {
            let filter = match (params.get("preset"), params.get("matrix")) {
                (Some(_), Some(_)) => {
                    return Err(FxError::validation(
                        "color_matrix takes either 'preset' or 'matrix', not both",
                    ));
                }
                (Some(preset), None) => ColorMatrixFilter::from_preset(parse_preset(preset, params)?),
                (None, Some(matrix)) => ColorMatrixFilter::new(parse_matrix(matrix)?)?,
                (None, None) => {
                    return Err(FxError::validation(
                        "color_matrix needs a 'preset' or a 'matrix'",
                    ));
                }
            };
            if let Some(alpha) = opt_f32(params, "alpha")? {
                filter.set_alpha(alpha);
            }
            spec.settings.apply(filter.state())?;
            Ok(Rc::new(filter))
        }
        "blendmode" | "blend_mode" | "blend-mode" => {
            let mode = match params.get("mode") {
                Some(v) => serde_json::from_value::<CompositeMode>(v.clone()).map_err(|e| {
                    FxError::validation(format!("blend_mode.mode is not a known mode: {e}"))
                })?,
                None => CompositeMode::default(),
            };
            let filter = BlendModeFilter::new(mode);
            spec.settings.apply(filter.state())?;
            Ok(Rc::new(filter))
        }
        _ => Err(FxError::validation(format!(
            "unknown filter kind '{}' (expected one of: {})",
            spec.kind,
            BUILTIN_KINDS.join(", ")
        ))),
    }
}

/// Parse either a bare array of [`FilterSpec`]s or an object with a `filters` array.
pub fn parse_filter_chain(value: &serde_json::Value) -> FxResult<Vec<Rc<dyn Filter>>> {
    let list = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(obj) => obj
            .get("filters")
            .ok_or_else(|| FxError::validation("filter chain object needs a 'filters' array"))?,
        _ => {
            return Err(FxError::validation(
                "filter chain must be an array or an object with 'filters'",
            ));
        }
    };
    let specs: Vec<FilterSpec> = serde_json::from_value(list.clone())?;
    specs.iter().map(parse_filter).collect()
}

fn parse_preset(preset: &serde_json::Value, params: &serde_json::Value) -> FxResult<ColorPreset> {
    let name = preset
        .as_str()
        .ok_or_else(|| FxError::validation("color_matrix.preset must be a string"))?;
    let amount = opt_f32(params, "amount")?.unwrap_or(1.0);
    match name.trim().to_ascii_lowercase().as_str() {
        "brightness" => Ok(ColorPreset::Brightness(amount)),
        "grayscale" | "greyscale" => Ok(ColorPreset::Grayscale(amount)),
        "sepia" => Ok(ColorPreset::Sepia(amount)),
        "negative" | "invert" => Ok(ColorPreset::Negative),
        other => Err(FxError::validation(format!(
            "unknown color_matrix preset '{other}'"
        ))),
    }
}

fn parse_matrix(matrix: &serde_json::Value) -> FxResult<ColorMatrix> {
    let arr = matrix
        .as_array()
        .ok_or_else(|| FxError::validation("color_matrix.matrix must be an array"))?;
    if arr.len() != 20 {
        return Err(FxError::validation(format!(
            "color_matrix.matrix must have 20 entries, got {}",
            arr.len()
        )));
    }
    let mut out = [0.0f32; 20];
    for (slot, v) in out.iter_mut().zip(arr) {
        *slot = v
            .as_f64()
            .ok_or_else(|| FxError::validation("color_matrix.matrix entries must be numbers"))?
            as f32;
    }
    Ok(out)
}

fn opt_f32(obj: &serde_json::Value, key: &str) -> FxResult<Option<f32>> {
    if obj.get(key).is_none() {
        return Ok(None);
    }
    get_f32(obj, key).map(Some)
}

fn opt_u32(obj: &serde_json::Value, key: &str) -> FxResult<Option<u32>> {
    if obj.get(key).is_none() {
        return Ok(None);
    }
    get_u32(obj, key).map(Some)
}

fn get_u32(obj: &serde_json::Value, key: &str) -> FxResult<u32> {
    let Some(v) = obj.get(key) else {
        return Err(FxError::validation(format!("missing filter param '{key}'")));
    };
    let Some(n) = v.as_u64() else {
        return Err(FxError::validation(format!(
            "filter param '{key}' must be an integer"
        )));
    };
    u32::try_from(n)
        .map_err(|_| FxError::validation(format!("filter param '{key}' is out of range")))
}

fn get_f32(obj: &serde_json::Value, key: &str) -> FxResult<f32> {
    let Some(v) = obj.get(key) else {
        return Err(FxError::validation(format!("missing filter param '{key}'")));
    };
    let Some(n) = v.as_f64() else {
        return Err(FxError::validation(format!(
            "filter param '{key}' must be a number"
        )));
    };
    let n = n as f32;
    if !n.is_finite() {
        return Err(FxError::validation(format!(
            "filter param '{key}' must be finite"
        )));
    }
    Ok(n)
}

#[cfg(test)]
#[path = "../../tests/unit/filter/parse.rs"]
mod tests;
