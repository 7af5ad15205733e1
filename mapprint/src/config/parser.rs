//! INI parsing logic for converting `Ini` → `JobFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::MAX_RESOLUTION;
use super::file::ConfigFileError;
use super::settings::*;
use crate::coord::{validate_lat_lng, validate_zoom, LatLng};
use crate::job::{Margins, Orientation};

const PAGE_PREFIX: &str = "page.";
const LAYER_PREFIX: &str = "layer.";

/// Parse an `Ini` object into a `JobFile`.
///
/// Starts from defaults and overlays any values found in the INI. Pages and
/// layers keep the order their sections appear in.
pub(super) fn parse_ini(ini: &Ini) -> Result<JobFile, ConfigFileError> {
    let mut config = JobFile::default();

    // [job] section
    if let Some(section) = ini.section(Some("job")) {
        parse_job(section, &mut config.job)?;
    }

    // [page.*] and [layer.*] sections
    for (name, section) in ini.iter() {
        let Some(name) = name else {
            continue;
        };
        if let Some(label) = name.strip_prefix(PAGE_PREFIX) {
            config.pages.push(parse_page(name, label, section)?);
        } else if let Some(layer) = name.strip_prefix(LAYER_PREFIX) {
            config.layers.push(parse_layer(name, layer, section)?);
        }
    }

    // [decorations] section
    if let Some(section) = ini.section(Some("decorations")) {
        let decorations = &mut config.decorations;
        if let Some(v) = get(section, "grid") {
            decorations.grid = parse_bool("decorations", "grid", v)?;
        }
        if let Some(v) = get(section, "scale") {
            decorations.scale = parse_bool("decorations", "scale", v)?;
        }
        if let Some(v) = get(section, "magnetic_meridians") {
            decorations.magnetic_meridians = parse_bool("decorations", "magnetic_meridians", v)?;
        }
        if let Some(v) = get(section, "declination") {
            decorations.declination = parse_number("decorations", "declination", v)
                .and_then(|d: f64| {
                    if (-180.0..=180.0).contains(&d) {
                        Ok(d)
                    } else {
                        Err(invalid("decorations", "declination", v, "must be within -180..180 degrees"))
                    }
                })?;
        }
        if let Some(v) = get(section, "font") {
            if !v.is_empty() {
                decorations.font = Some(PathBuf::from(v));
            }
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = get(section, "timeout") {
            config.download.timeout = v
                .parse()
                .ok()
                .filter(|t| *t > 0)
                .ok_or_else(|| invalid("download", "timeout", v, "must be a positive integer (seconds)"))?;
        }
    }

    if config.pages.is_empty() {
        return Err(ConfigFileError::InvalidJob(
            "no [page.*] section".to_string(),
        ));
    }
    if config.layers.is_empty() {
        return Err(ConfigFileError::InvalidJob(
            "no [layer.*] section".to_string(),
        ));
    }

    Ok(config)
}

fn parse_job(section: &Properties, job: &mut JobSettings) -> Result<(), ConfigFileError> {
    if let Some(v) = get(section, "format") {
        job.format = v
            .parse()
            .map_err(|_| invalid("job", "format", v, "must be 'pdf' or 'jpeg'"))?;
    }
    if let Some(v) = get(section, "resolution") {
        job.resolution = positive("job", "resolution", v)?;
        if job.resolution > MAX_RESOLUTION {
            return Err(invalid("job", "resolution", v, "must be at most 1200 dpi"));
        }
    }
    if let Some(v) = get(section, "scale") {
        job.scale = positive("job", "scale", v)?;
    }
    if let Some(v) = get(section, "paper") {
        let (width, height) = v
            .split_once(['x', 'X'])
            .and_then(|(w, h)| Some((w.trim().parse::<f64>().ok()?, h.trim().parse::<f64>().ok()?)))
            .filter(|(w, h)| *w > 0.0 && *h > 0.0)
            .ok_or_else(|| invalid("job", "paper", v, "expected WIDTHxHEIGHT in millimetres, like 210x297"))?;
        job.paper_width_mm = width;
        job.paper_height_mm = height;
    }
    if let Some(v) = get(section, "margins") {
        job.margins = parse_margins(v)?;
    }
    if let Some(v) = get(section, "map_zoom") {
        job.map_zoom = Some(parse_zoom("job", "map_zoom", v)?);
    }
    if let Some(v) = get(section, "sat_zoom") {
        job.sat_zoom = Some(parse_zoom("job", "sat_zoom", v)?);
    }
    if let Some(v) = get(section, "max_active") {
        job.max_active = v
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid("job", "max_active", v, "must be a positive integer"))?;
    }
    if let Some(v) = get(section, "jpeg_quality") {
        job.jpeg_quality = v
            .parse()
            .ok()
            .filter(|q| (1..=100).contains(q))
            .ok_or_else(|| invalid("job", "jpeg_quality", v, "must be between 1 and 100"))?;
    }

    let margins = job.margins;
    if margins.left + margins.right >= job.paper_width_mm
        || margins.top + margins.bottom >= job.paper_height_mm
    {
        return Err(invalid(
            "job",
            "margins",
            &format!(
                "{},{},{},{}",
                margins.left, margins.top, margins.right, margins.bottom
            ),
            "margins leave no printable area",
        ));
    }
    Ok(())
}

fn parse_page(section_name: &str, label: &str, section: &Properties) -> Result<PageSettings, ConfigFileError> {
    if label.is_empty() {
        return Err(ConfigFileError::InvalidJob(format!(
            "section [{}] needs a page label",
            section_name
        )));
    }
    let v = get(section, "center").ok_or_else(|| ConfigFileError::MissingValue {
        section: section_name.to_string(),
        key: "center".to_string(),
    })?;
    let center = v
        .split_once(',')
        .and_then(|(lat, lng)| Some(LatLng::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?)))
        .ok_or_else(|| invalid(section_name, "center", v, "expected LAT,LNG in degrees"))?;
    let center = validate_lat_lng(center).map_err(|e| invalid(section_name, "center", v, &e.to_string()))?;

    let orientation = match get(section, "orientation") {
        None => Orientation::Portrait,
        Some(v) => match v.to_lowercase().as_str() {
            "portrait" => Orientation::Portrait,
            "landscape" => Orientation::Landscape,
            _ => {
                return Err(invalid(
                    section_name,
                    "orientation",
                    v,
                    "must be 'portrait' or 'landscape'",
                ))
            }
        },
    };

    Ok(PageSettings {
        label: label.to_string(),
        center,
        orientation,
    })
}

fn parse_layer(section_name: &str, name: &str, section: &Properties) -> Result<LayerSettings, ConfigFileError> {
    let url = get(section, "url")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigFileError::MissingValue {
            section: section_name.to_string(),
            key: "url".to_string(),
        })?;
    if !(url.contains("{z}") && url.contains("{x}") && url.contains("{y}")) {
        return Err(invalid(section_name, "url", url, "must contain {z}, {x} and {y}"));
    }

    let mut layer = LayerSettings::new(name, url);
    if let Some(v) = get(section, "subdomains") {
        layer.subdomains = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if layer.url.contains("{s}") && layer.subdomains.is_empty() {
        return Err(invalid(section_name, "url", url, "uses {s} but no subdomains are set"));
    }
    if let Some(v) = get(section, "short_name") {
        if !v.is_empty() {
            layer.short_name = v.to_string();
        }
    }
    if let Some(v) = get(section, "order") {
        layer.order = v
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid(section_name, "order", v, "expected integers, like 10 or 1,2"))?;
    }
    if let Some(v) = get(section, "print") {
        layer.print = parse_bool(section_name, "print", v)?;
    }
    if let Some(v) = get(section, "overlay") {
        layer.overlay = parse_bool(section_name, "overlay", v)?;
    }
    if let Some(v) = get(section, "transparent") {
        layer.transparent = parse_bool(section_name, "transparent", v)?;
    }
    if let Some(v) = get(section, "scale_dependent") {
        layer.scale_dependent = parse_bool(section_name, "scale_dependent", v)?;
    }
    if let Some(v) = get(section, "tile_size") {
        layer.tile_size = match v.parse() {
            Ok(size @ (256 | 512)) => size,
            _ => return Err(invalid(section_name, "tile_size", v, "must be 256 or 512")),
        };
    }
    if let Some(v) = get(section, "max_zoom") {
        layer.max_zoom = v
            .parse::<u8>()
            .ok()
            .filter(|z| *z <= 22)
            .ok_or_else(|| invalid(section_name, "max_zoom", v, "must be between 0 and 22"))?;
    }
    if let Some(v) = get(section, "weight") {
        layer.weight = positive(section_name, "weight", v)?;
    }
    Ok(layer)
}

/// `7` for all sides, or `left,top,right,bottom`.
fn parse_margins(v: &str) -> Result<Margins, ConfigFileError> {
    let parts: Vec<f64> = v
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid("job", "margins", v, "expected millimetres, like 7 or 5,7,5,7"))?;
    if parts.iter().any(|m| *m < 0.0 || !m.is_finite()) {
        return Err(invalid("job", "margins", v, "must not be negative"));
    }
    match parts.as_slice() {
        [all] => Ok(Margins::uniform(*all)),
        [left, top, right, bottom] => Ok(Margins {
            left: *left,
            top: *top,
            right: *right,
            bottom: *bottom,
        }),
        _ => Err(invalid("job", "margins", v, "expected one value or four")),
    }
}

/// Value of `key` with any trailing `; comment` removed.
fn get<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(|v| {
        let v = match v.find(" ;").or_else(|| v.find("\t;")) {
            Some(at) => &v[..at],
            None => v,
        };
        v.trim()
    })
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(section: &str, key: &str, v: &str) -> Result<bool, ConfigFileError> {
    match v.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(invalid(section, key, v, "must be true or false")),
    }
}

fn parse_number<T: FromStr>(section: &str, key: &str, v: &str) -> Result<T, ConfigFileError> {
    v.parse().map_err(|_| invalid(section, key, v, "must be a number"))
}

fn positive(section: &str, key: &str, v: &str) -> Result<f64, ConfigFileError> {
    let value: f64 = parse_number(section, key, v)?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(section, key, v, "must be a positive number"))
    }
}

fn parse_zoom(section: &str, key: &str, v: &str) -> Result<u8, ConfigFileError> {
    v.parse::<u8>()
        .ok()
        .and_then(|z| validate_zoom(z).ok())
        .ok_or_else(|| invalid(section, key, v, "must be between 0 and 18"))
}
