// 🗺️ Exports - TSV, KML and console renderings of a run

use crate::record::{AccessPointRecord, MovementRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

const TSV_HEADER: [&str; 6] = ["BSSID", "Latitude", "Longitude", "Channel", "Hacc", "Timestamp"];
const TSV_MOVEMENT_HEADER: [&str; 5] = [
    "OldLatitude",
    "OldLongitude",
    "OldTimestamp",
    "DistanceKm",
    "TimeDiffHours",
];

/// ISO-8601 UTC with milliseconds, empty when out of range
pub fn iso_timestamp(epoch_millis: i64) -> String {
    DateTime::from_timestamp_millis(epoch_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

fn local_time(epoch_millis: i64) -> String {
    DateTime::from_timestamp_millis(epoch_millis)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn movements_by_id(movements: &[MovementRecord]) -> HashMap<&str, &MovementRecord> {
    movements
        .iter()
        .map(|m| (m.normalized_identifier.as_str(), m))
        .collect()
}

/// `--movement-only`: keep the locations that have a movement record
pub fn only_moved(locations: &[AccessPointRecord], movements: &[MovementRecord]) -> Vec<AccessPointRecord> {
    let moved = movements_by_id(movements);
    locations
        .iter()
        .filter(|l| moved.contains_key(l.normalized_identifier.as_str()))
        .cloned()
        .collect()
}

// ============================================================================
// TSV
// ============================================================================

/// Tab-separated rows. With `compared`, five movement columns are appended
/// and left empty for access points that did not move.
pub fn render_tsv<W: Write>(
    writer: W,
    locations: &[AccessPointRecord],
    movements: &[MovementRecord],
    compared: bool,
) -> Result<()> {
    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(writer);

    let mut header: Vec<&str> = TSV_HEADER.to_vec();
    if compared {
        header.extend(TSV_MOVEMENT_HEADER);
    }
    tsv.write_record(&header)?;

    let moved = movements_by_id(movements);
    for loc in locations {
        let mut row = vec![
            loc.normalized_identifier.clone(),
            loc.latitude.to_string(),
            loc.longitude.to_string(),
            loc.channel.to_string(),
            loc.horizontal_accuracy_meters.to_string(),
            iso_timestamp(loc.observed_at_epoch_millis),
        ];

        match moved.get(loc.normalized_identifier.as_str()) {
            Some(m) => row.extend([
                m.previous_location.latitude.to_string(),
                m.previous_location.longitude.to_string(),
                iso_timestamp(m.previous_location.observed_at_epoch_millis),
                format!("{:.5}", m.distance_km),
                format!("{:.2}", m.elapsed_hours),
            ]),
            None if compared => row.extend(std::iter::repeat(String::new()).take(5)),
            None => {}
        }

        tsv.write_record(&row)?;
    }

    tsv.flush()?;
    Ok(())
}

pub fn write_tsv(
    path: &Path,
    locations: &[AccessPointRecord],
    movements: &[MovementRecord],
    compared: bool,
) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create TSV file: {}", path.display()))?;
    render_tsv(file, locations, movements, compared)
        .with_context(|| format!("Failed to write TSV file: {}", path.display()))
}

// ============================================================================
// KML
// ============================================================================

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

type XmlWriter = Writer<Vec<u8>>;

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> quick_xml::Result<()> {
    w.create_element(name).write_text_content(BytesText::new(text))?;
    Ok(())
}

fn icon_style(w: &mut XmlWriter, id: &str, scale: &str, href: &str, color: Option<&str>) -> quick_xml::Result<()> {
    w.create_element("Style")
        .with_attribute(("id", id))
        .write_inner_content(|w| {
            w.create_element("IconStyle").write_inner_content(|w| {
                text_element(w, "scale", scale)?;
                w.create_element("Icon")
                    .write_inner_content(|w| text_element(w, "href", href))?;
                if let Some(color) = color {
                    text_element(w, "color", color)?;
                }
                Ok::<(), quick_xml::Error>(())
            })?;
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(())
}

fn write_styles(w: &mut XmlWriter) -> quick_xml::Result<()> {
    icon_style(w, "stablePoint", "1.0", "http://maps.google.com/mapfiles/kml/paddle/ylw-blank.png", None)?;
    icon_style(
        w,
        "oldMovedPoint",
        "0.8",
        "http://maps.google.com/mapfiles/kml/paddle/red-blank.png",
        Some("990000ff"),
    )?;
    icon_style(w, "newMovedPoint", "1.2", "http://maps.google.com/mapfiles/kml/paddle/grn-blank.png", None)?;

    w.create_element("Style")
        .with_attribute(("id", "movementLine"))
        .write_inner_content(|w| {
            w.create_element("LineStyle").write_inner_content(|w| {
                text_element(w, "color", "ff00aaff")?;
                text_element(w, "width", "2")
            })?;
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(())
}

/// `geometry` is `Point` or `LineString`, `coordinates` in KML `lon,lat,alt` order
fn placemark(
    w: &mut XmlWriter,
    name: &str,
    style: &str,
    description: Option<&str>,
    geometry: &str,
    coordinates: &str,
) -> quick_xml::Result<()> {
    w.create_element("Placemark").write_inner_content(|w| {
        text_element(w, "name", name)?;
        text_element(w, "styleUrl", style)?;
        if let Some(description) = description {
            text_element(w, "description", description)?;
        }
        w.create_element(geometry)
            .write_inner_content(|w| text_element(w, "coordinates", coordinates))?;
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

fn point(lat: f64, lon: f64) -> String {
    format!("{lon},{lat},0")
}

/// KML document: old positions and movement lines first, so current
/// positions draw on top of them.
pub fn render_kml(
    locations: &[AccessPointRecord],
    movements: &[MovementRecord],
    movement_only: bool,
) -> Result<String> {
    let moved = movements_by_id(movements);
    let shown: Vec<&AccessPointRecord> = locations
        .iter()
        .filter(|l| !movement_only || moved.contains_key(l.normalized_identifier.as_str()))
        .collect();

    let write_movements = |w: &mut XmlWriter| -> quick_xml::Result<()> {
        text_element(w, "name", "Movements")?;
        for m in movements {
            let id = m.normalized_identifier.as_str();
            if movement_only && !shown.iter().any(|l| l.normalized_identifier == id) {
                continue;
            }

            let old = &m.previous_location;
            let new = &m.current_location;
            let description = format!(
                "BSSID: {id}\nTimestamp: {}\nCoords: {}, {}\nMoved: {:.3} km over {:.1} hours",
                iso_timestamp(old.observed_at_epoch_millis),
                old.latitude,
                old.longitude,
                m.distance_km,
                m.elapsed_hours,
            );
            placemark(
                w,
                &format!("{id} (Old)"),
                "#oldMovedPoint",
                Some(&description),
                "Point",
                &point(old.latitude, old.longitude),
            )?;
            placemark(
                w,
                &format!("Movement: {id}"),
                "#movementLine",
                None,
                "LineString",
                &format!("{} {}", point(old.latitude, old.longitude), point(new.latitude, new.longitude)),
            )?;
        }
        Ok(())
    };

    let write_current = |w: &mut XmlWriter| -> quick_xml::Result<()> {
        text_element(w, "name", "Current Locations")?;
        for loc in shown.iter().filter(|l| l.has_usable_coordinates()) {
            let id = loc.normalized_identifier.as_str();
            let movement = moved.get(id);
            let style = if movement.is_some() { "#newMovedPoint" } else { "#stablePoint" };

            let mut description = format!(
                "BSSID: {id}\nTimestamp: {}\nCoords: {}, {}\nChannel: {}\nHacc: {}m",
                iso_timestamp(loc.observed_at_epoch_millis),
                loc.latitude,
                loc.longitude,
                loc.channel,
                loc.horizontal_accuracy_meters,
            );
            if let Some(m) = movement {
                let _ = write!(
                    description,
                    "\nMoved: {:.3} km from {}, {}",
                    m.distance_km, m.previous_location.latitude, m.previous_location.longitude
                );
            }

            placemark(w, id, style, Some(&description), "Point", &point(loc.latitude, loc.longitude))?;
        }
        Ok(())
    };

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element("kml")
        .with_attribute(("xmlns", KML_NAMESPACE))
        .write_inner_content(|w| {
            w.create_element("Document").write_inner_content(|w| {
                text_element(w, "name", "BSSID Locations & Movements")?;
                write_styles(w)?;
                if !movements.is_empty() {
                    w.create_element("Folder").write_inner_content(write_movements)?;
                }
                w.create_element("Folder").write_inner_content(write_current)?;
                Ok::<(), quick_xml::Error>(())
            })?;
            Ok::<(), quick_xml::Error>(())
        })?;

    let mut kml = String::from_utf8(writer.into_inner()).context("KML output is not UTF-8")?;
    kml.push('\n');
    Ok(kml)
}

pub fn write_kml(
    path: &Path,
    locations: &[AccessPointRecord],
    movements: &[MovementRecord],
    movement_only: bool,
) -> Result<()> {
    let kml = render_kml(locations, movements, movement_only)?;
    std::fs::write(path, kml)
        .with_context(|| format!("Failed to write KML file: {}", path.display()))
}

// ============================================================================
// CONSOLE
// ============================================================================

pub fn render_console(
    locations: &[AccessPointRecord],
    movements: &[MovementRecord],
    compared: bool,
) -> String {
    let moved = movements_by_id(movements);
    let mut out = String::new();

    let _ = write!(
        out,
        "{:<17} {:<12} {:<13} Ch Hacc Timestamp",
        "BSSID", "Latitude", "Longitude"
    );
    if compared {
        let _ = write!(out, " {:<12} {:<13} DistanceKm TimeDiffHrs", "OldLat", "OldLon");
    }
    out.push('\n');

    for loc in locations {
        let _ = write!(
            out,
            "{:<17} {:<12.8} {:<13.8} {:<3} {:<4} {}",
            loc.normalized_identifier,
            loc.latitude,
            loc.longitude,
            loc.channel,
            loc.horizontal_accuracy_meters,
            local_time(loc.observed_at_epoch_millis),
        );
        match moved.get(loc.normalized_identifier.as_str()) {
            Some(m) => {
                let _ = write!(
                    out,
                    " {:<12.8} {:<13.8} {:<10.3} {:<11.1}",
                    m.previous_location.latitude,
                    m.previous_location.longitude,
                    m.distance_km,
                    m.elapsed_hours
                );
            }
            None if compared => {
                let _ = write!(out, " {:<12} {:<13} {:<10} {:<11}", "", "", "", "");
            }
            None => {}
        }
        out.push('\n');
    }

    out
}
