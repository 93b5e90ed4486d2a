//! Node colors: the per-type palette and the blend used for collapsed groups.

use archcanvas_core::NodeType;

/// Luma floor applied by [`blend`].
pub const DEFAULT_MIN_LUMA: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("cannot blend an empty color list")]
    Empty,
    #[error("'{0}' is not a #RRGGBB color")]
    InvalidHex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn parse_hex(s: &str) -> Result<Rgb, ColorError> {
        let invalid = || ColorError::InvalidHex(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn luma(self) -> f64 {
        0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b)
    }
}

/// Fill color for each node type.
pub fn type_color(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Database => "#3B82F6",
        NodeType::Cache => "#EF4444",
        NodeType::Server => "#10B981",
        NodeType::Api => "#8B5CF6",
        NodeType::Loadbalancer => "#F59E0B",
        NodeType::Queue => "#EC4899",
        NodeType::Cdn => "#06B6D4",
        NodeType::Gateway => "#6366F1",
        NodeType::Storage => "#84CC16",
        NodeType::Service => "#14B8A6",
        NodeType::Group => "#64748B",
    }
}

/// Blend colors with the default luma floor.
pub fn blend<S: AsRef<str>>(colors: &[S]) -> Result<String, ColorError> {
    blend_with_floor(colors, DEFAULT_MIN_LUMA)
}

/// Average `colors` per channel, then brighten the result if its luma is
/// under `min_luma`. A single color is returned exactly as given.
///
/// Channel means are truncated toward zero, not rounded to nearest: red and
/// green must blend to `#7F7F00` (127.5 → 127), which round-to-nearest would
/// turn into `#808000`. Only the luma scaling step rounds.
pub fn blend_with_floor<S: AsRef<str>>(colors: &[S], min_luma: f64) -> Result<String, ColorError> {
    let parsed = colors
        .iter()
        .map(|c| Rgb::parse_hex(c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    match (colors, parsed.as_slice()) {
        ([], _) => Err(ColorError::Empty),
        ([only], _) => Ok(only.as_ref().to_string()),
        (_, all) => Ok(brighten(mean(all), min_luma).to_hex()),
    }
}

fn mean(colors: &[Rgb]) -> Rgb {
    let n = colors.len() as u32;
    let (r, g, b) = colors.iter().fold((0u32, 0u32, 0u32), |(r, g, b), c| {
        (r + u32::from(c.r), g + u32::from(c.g), b + u32::from(c.b))
    });
    Rgb {
        r: (r / n).min(255) as u8,
        g: (g / n).min(255) as u8,
        b: (b / n).min(255) as u8,
    }
}

fn brighten(color: Rgb, min_luma: f64) -> Rgb {
    let luma = color.luma();
    if luma >= min_luma {
        return color;
    }
    if luma <= 0.0 {
        // Pure black has nothing to scale; use the floor as a neutral gray.
        let level = min_luma.round().clamp(0.0, 255.0) as u8;
        return Rgb {
            r: level,
            g: level,
            b: level,
        };
    }
    let factor = min_luma / luma;
    let scale = |c: u8| (f64::from(c) * factor).round().clamp(0.0, 255.0) as u8;
    Rgb {
        r: scale(color.r),
        g: scale(color.g),
        b: scale(color.b),
    }
}

/// Representative color for a collapsed group holding the given leaf types.
pub fn group_color(child_types: &[NodeType], min_luma: f64) -> Option<String> {
    let mut distinct: Vec<NodeType> = Vec::new();
    for t in child_types.iter().copied().filter(|t| t.is_leaf()) {
        if !distinct.contains(&t) {
            distinct.push(t);
        }
    }
    let palette: Vec<&str> = distinct.into_iter().map(type_color).collect();
    blend_with_floor(&palette, min_luma).ok()
}
