//! Color arithmetic for theme resolution: hex/RGB/HSL conversion, DrawingML
//! luminance modifiers and the preset color table.

/// Parses `RRGGBB` or `#RRGGBB`.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}

/// Normalizes any parseable hex value to `#RRGGBB`.
pub fn normalize_hex(hex: &str) -> Option<String> {
    hex_to_rgb(hex).map(|(r, g, b)| rgb_to_hex(r, g, b))
}

/// Hue in degrees, saturation and lightness in `0.0..=1.0`.
pub fn hex_to_hsl(hex: &str) -> Option<(f64, f64, f64)> {
    let (r, g, b) = hex_to_rgb(hex)?;
    let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return Some((0.0, 0.0, l));
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Some((h * 60.0, s, l))
}

pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return rgb_to_hex(v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = (h / 360.0).rem_euclid(1.0);
    let channel = |t: f64| -> u8 {
        let t = t.rem_euclid(1.0);
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };

    rgb_to_hex(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

/// Applies `lumMod` and `lumOff`, both given in percent, to a hex color.
///
/// The lightness is multiplied first and offset second, matching how
/// DrawingML evaluates a `schemeClr` with both children.
pub fn apply_luminance(hex: &str, lum_mod: Option<f64>, lum_off: Option<f64>) -> Option<String> {
    let (h, s, l) = hex_to_hsl(hex)?;
    let mut lightness = l;
    if let Some(m) = lum_mod {
        lightness *= m / 100.0;
    }
    if let Some(o) = lum_off {
        lightness += o / 100.0;
    }
    Some(hsl_to_hex(h, s, lightness.clamp(0.0, 1.0)))
}

/// Hex value of a DrawingML preset color name (`a:prstClr`).
pub fn preset_color(name: &str) -> Option<&'static str> {
    let hex = match name.to_ascii_lowercase().as_str() {
        "black" => "#000000",
        "white" => "#FFFFFF",
        "red" => "#FF0000",
        "green" => "#008000",
        "lime" => "#00FF00",
        "blue" => "#0000FF",
        "yellow" => "#FFFF00",
        "cyan" | "aqua" => "#00FFFF",
        "magenta" | "fuchsia" => "#FF00FF",
        "gray" | "grey" => "#808080",
        "dkgray" | "darkgray" => "#A9A9A9",
        "ltgray" | "lightgray" => "#D3D3D3",
        "silver" => "#C0C0C0",
        "orange" => "#FFA500",
        "purple" => "#800080",
        "navy" => "#000080",
        "teal" => "#008080",
        "maroon" => "#800000",
        "olive" => "#808000",
        "brown" => "#A52A2A",
        "pink" => "#FFC0CB",
        "gold" => "#FFD700",
        "dkblue" | "darkblue" => "#00008B",
        "dkred" | "darkred" => "#8B0000",
        "dkgreen" | "darkgreen" => "#006400",
        "ltblue" | "lightblue" => "#ADD8E6",
        _ => return None,
    };
    Some(hex)
}
