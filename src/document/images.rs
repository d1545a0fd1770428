//! Image extraction straight from the .docx package
//!
//! docx-rs tells us *that* a run holds a drawing but not which media part it
//! points at, so the package is scanned directly: image relationships come
//! from `word/_rels/document.xml.rels` and their order from the `a:blip` /
//! `v:imagedata` references in `word/document.xml`.

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::io::{Package, read_part, resolve_part_target};
use super::models::{ExtractedImage, ImageAnchor, ImageFormat};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const IMAGE_RELATIONSHIP_SUFFIX: &str = "/image";

/// Images of one package plus the body paragraphs that anchor them
#[derive(Debug, Default)]
pub(crate) struct ImageScan {
    /// Every image, in extraction order
    pub images: Vec<ExtractedImage>,
    /// Body paragraph ordinal to indices into `images`
    pub paragraph_images: HashMap<usize, Vec<usize>>,
}

#[derive(Debug)]
struct ImageReference {
    relationship_id: String,
    /// Ordinal of the enclosing body-level paragraph
    paragraph: Option<usize>,
}

#[derive(Debug)]
struct OpenParagraph {
    ordinal: usize,
    depth: usize,
}

pub(crate) fn scan_package_images(archive: &mut Package<'_>) -> Result<ImageScan> {
    let relationships = match read_part(archive, DOCUMENT_RELS_PART)? {
        Some(xml) => parse_image_relationships(&String::from_utf8_lossy(&xml))?,
        None => Vec::new(),
    };
    if relationships.is_empty() {
        return Ok(ImageScan::default());
    }

    let document_xml = read_part(archive, DOCUMENT_PART)?.unwrap_or_default();
    let references = scan_image_references(&String::from_utf8_lossy(&document_xml))?;

    let targets: HashMap<&str, &str> = relationships
        .iter()
        .map(|(id, target)| (id.as_str(), target.as_str()))
        .collect();

    let mut scan = ImageScan::default();
    let mut media_cache: HashMap<String, Option<Vec<u8>>> = HashMap::new();
    let mut referenced = std::collections::HashSet::new();

    for reference in &references {
        let Some(target) = targets.get(reference.relationship_id.as_str()) else {
            debug!(rid = %reference.relationship_id, "Image reference without an image relationship");
            continue;
        };
        referenced.insert(reference.relationship_id.as_str());

        let part_name = resolve_part_target("word", target);
        let Some(data) = load_media(archive, &mut media_cache, &part_name) else {
            continue;
        };

        let sequence = scan.images.len();
        let anchor = reference.paragraph.map(|paragraph| {
            scan.paragraph_images.entry(paragraph).or_default().push(sequence);
            ImageAnchor {
                paragraph,
                sequence,
            }
        });
        scan.images.push(build_image(&part_name, data, anchor));
    }

    // Relationship images the body never points at go last
    for (id, target) in &relationships {
        if referenced.contains(id.as_str()) {
            continue;
        }
        let part_name = resolve_part_target("word", target);
        if let Some(data) = load_media(archive, &mut media_cache, &part_name) {
            scan.images.push(build_image(&part_name, data, None));
        }
    }

    debug!(
        images = scan.images.len(),
        anchored_paragraphs = scan.paragraph_images.len(),
        "Scanned package images"
    );
    Ok(scan)
}

fn load_media(
    archive: &mut Package<'_>,
    cache: &mut HashMap<String, Option<Vec<u8>>>,
    part_name: &str,
) -> Option<Vec<u8>> {
    if let Some(cached) = cache.get(part_name) {
        return cached.clone();
    }

    let data = match read_part(archive, part_name) {
        Ok(Some(data)) if !data.is_empty() => Some(data),
        Ok(_) => {
            warn!(part = part_name, "Image part is missing or empty");
            None
        }
        Err(err) => {
            warn!(part = part_name, error = %err, "Failed to read image part");
            None
        }
    };
    cache.insert(part_name.to_string(), data.clone());
    data
}

fn build_image(part_name: &str, data: Vec<u8>, anchor: Option<ImageAnchor>) -> ExtractedImage {
    let name = part_name.rsplit('/').next().unwrap_or(part_name).to_string();
    let format = match name.rsplit_once('.') {
        Some((_, extension)) => ImageFormat::from_extension(extension),
        None => ImageFormat::Unknown,
    };
    let format = if format == ImageFormat::Unknown {
        ImageFormat::sniff(&data)
    } else {
        format
    };

    ExtractedImage {
        name,
        data,
        format,
        anchor,
    }
}

/// Collect `(Id, Target)` for internal image relationships, in file order
fn parse_image_relationships(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                let mut is_image = false;
                let mut external = false;

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.as_ref() {
                        b"Id" => id = Some(value),
                        b"Target" => target = Some(value),
                        b"Type" => is_image = value.ends_with(IMAGE_RELATIONSHIP_SUFFIX),
                        b"TargetMode" => external = value.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }

                if let (true, false, Some(id), Some(target)) = (is_image, external, id, target) {
                    relationships.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Walk `document.xml` for image references in document order
///
/// A reference anywhere inside a body-level `w:p` (runs, hyperlinks,
/// `mc:AlternateContent`, VML) is anchored at that paragraph's ordinal among
/// the body's paragraphs. References outside body paragraphs, such as table
/// cells, stay unanchored.
fn scan_image_references(xml: &str) -> Result<Vec<ImageReference>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut references = Vec::new();
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut paragraph: Option<OpenParagraph> = None;
    let mut body_paragraphs = 0usize;
    // Depth of an open mc:Fallback, whose images repeat the mc:Choice ones
    let mut fallback_depth: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"w:body" => body_depth = Some(depth),
                    b"mc:Fallback" if fallback_depth.is_none() => fallback_depth = Some(depth),
                    b"w:p" if paragraph.is_none() && body_depth.is_some_and(|d| depth == d + 1) => {
                        paragraph = Some(OpenParagraph {
                            ordinal: body_paragraphs,
                            depth,
                        });
                        body_paragraphs += 1;
                    }
                    _ => {}
                }
                if fallback_depth.is_none() {
                    collect_reference(e, paragraph.as_ref(), &mut references);
                }
            }
            Event::Empty(ref e) => {
                // <w:p/> still counts as a body paragraph
                if e.name().as_ref() == b"w:p"
                    && paragraph.is_none()
                    && body_depth.is_some_and(|d| depth == d)
                {
                    body_paragraphs += 1;
                }
                if fallback_depth.is_none() {
                    collect_reference(e, paragraph.as_ref(), &mut references);
                }
            }
            Event::End(ref e) => {
                if e.name().as_ref() == b"w:p" && paragraph.as_ref().is_some_and(|p| p.depth == depth) {
                    paragraph = None;
                }
                if fallback_depth == Some(depth) {
                    fallback_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(references)
}

fn collect_reference(
    e: &BytesStart<'_>,
    paragraph: Option<&OpenParagraph>,
    references: &mut Vec<ImageReference>,
) {
    if let Some(relationship_id) = image_relationship_id(e) {
        references.push(ImageReference {
            relationship_id,
            paragraph: paragraph.map(|open| open.ordinal),
        });
    }
}

fn image_relationship_id(e: &BytesStart<'_>) -> Option<String> {
    let attr_name = match e.local_name().as_ref() {
        b"blip" => b"embed".as_slice(),
        b"imagedata" => b"id".as_slice(),
        _ => return None,
    };

    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == attr_name)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
        .filter(|id| !id.is_empty())
}
