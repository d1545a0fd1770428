//! Template asset
//!
//! The template fixes page geometry, header/footer and a few style knobs.
//! It is a small TOML file read fresh for every job; nothing in the pipeline
//! writes back to it.

use anyhow::{Context, Result, bail};
use docx_rs::{AlignmentType, Docx, Footer, Header, LineSpacing, PageMargin, Paragraph, Run};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::style::NEUTRAL_COLOR;

const TWIPS_PER_INCH: f32 = 1440.0;
const MM_PER_INCH: f32 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeadingAlignment {
    #[default]
    Left,
    Center,
}

impl HeadingAlignment {
    pub(crate) fn to_docx(self) -> AlignmentType {
        match self {
            HeadingAlignment::Left => AlignmentType::Left,
            HeadingAlignment::Center => AlignmentType::Center,
        }
    }
}

/// Page size in millimetres, margins and distances in inches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub header_distance: f32,
    pub footer_distance: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        // A4 portrait, one inch margins
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_top: 1.0,
            margin_bottom: 1.0,
            margin_left: 1.0,
            margin_right: 1.0,
            header_distance: 0.5,
            footer_distance: 0.5,
        }
    }
}

impl PageGeometry {
    fn mm_to_twips(mm: f32) -> u32 {
        (mm / MM_PER_INCH * TWIPS_PER_INCH).round() as u32
    }

    fn inches_to_twips(inches: f32) -> i32 {
        (inches * TWIPS_PER_INCH).round() as i32
    }

    /// Usable width between the side margins, in twips
    pub fn text_width_twips(&self) -> u32 {
        let width = self.width_mm / MM_PER_INCH - self.margin_left - self.margin_right;
        (width.max(0.0) * TWIPS_PER_INCH).round() as u32
    }

    /// Usable width between the side margins, in inches
    pub fn text_width_inches(&self) -> f32 {
        self.text_width_twips() as f32 / TWIPS_PER_INCH
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub name: String,
    pub page: PageGeometry,
    /// Bold, centered title repeated in the page header
    pub header_title: Option<String>,
    /// Centered line in the page footer
    pub footer_text: Option<String>,
    pub heading_alignment: HeadingAlignment,
    /// Body text size in points (the house style uses 12 or 12.5)
    pub body_font_size: f32,
    /// Display width for images that are wide enough to need it
    pub image_width_inches: f32,
}

impl Default for Template {
    fn default() -> Self {
        Template {
            name: "default".to_string(),
            page: PageGeometry::default(),
            header_title: None,
            footer_text: None,
            heading_alignment: HeadingAlignment::Left,
            body_font_size: 12.5,
            image_width_inches: 6.0,
        }
    }
}

impl Template {
    /// Load a template from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Template not readable at {}", path.display()))?;
        let template: Template = toml::from_str(&content)
            .with_context(|| format!("Template at {} is not valid", path.display()))?;
        template.validate()?;
        Ok(template)
    }

    /// Write the template as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(6.0..=72.0).contains(&self.body_font_size) {
            bail!("body_font_size must be between 6 and 72 points");
        }
        if self.image_width_inches <= 0.0 {
            bail!("image_width_inches must be positive");
        }
        if self.page.text_width_twips() == 0 {
            bail!("page margins leave no room for text");
        }
        Ok(())
    }

    /// Image display width: the template width, capped by the text column
    pub fn max_image_width_inches(&self) -> f32 {
        self.image_width_inches.min(self.page.text_width_inches())
    }

    /// Fresh output document carrying this template's page setup
    pub fn new_document(&self) -> Docx {
        let page = &self.page;
        let mut docx = Docx::new()
            .page_size(
                PageGeometry::mm_to_twips(page.width_mm),
                PageGeometry::mm_to_twips(page.height_mm),
            )
            .page_margin(
                PageMargin::new()
                    .top(PageGeometry::inches_to_twips(page.margin_top))
                    .bottom(PageGeometry::inches_to_twips(page.margin_bottom))
                    .left(PageGeometry::inches_to_twips(page.margin_left))
                    .right(PageGeometry::inches_to_twips(page.margin_right))
                    .header(PageGeometry::inches_to_twips(page.header_distance))
                    .footer(PageGeometry::inches_to_twips(page.footer_distance)),
            );

        if let Some(title) = self.header_title.as_deref().filter(|t| !t.trim().is_empty()) {
            let run = Run::new().add_text(title).bold().size(24).color(NEUTRAL_COLOR);
            docx = docx.header(
                Header::new().add_paragraph(
                    Paragraph::new()
                        .add_run(run)
                        .align(AlignmentType::Center),
                ),
            );
        }

        if let Some(text) = self.footer_text.as_deref().filter(|t| !t.trim().is_empty()) {
            let run = Run::new().add_text(text).size(20).color(NEUTRAL_COLOR);
            docx = docx.footer(
                Footer::new().add_paragraph(
                    Paragraph::new()
                        .add_run(run)
                        .align(AlignmentType::Center)
                        .line_spacing(LineSpacing::new().after(0)),
                ),
            );
        }

        docx
    }
}

/// Where a job gets its template from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemplateSource {
    #[default]
    Builtin,
    File(PathBuf),
}

impl TemplateSource {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map(TemplateSource::File).unwrap_or_default()
    }

    /// Load the template; called once per job so jobs never share one
    pub fn load(&self) -> Result<Template> {
        match self {
            TemplateSource::Builtin => Ok(Template::default()),
            TemplateSource::File(path) => Template::load(path),
        }
    }
}
