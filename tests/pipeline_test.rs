use docreflow::document::{ContentElement, SourceDocument, content_count, extract};
use docreflow::reconstruct::{HeadingAlignment, Template, reconstruct};
use docreflow::reconstruct_file;
use docx_rs::{BreakType, Docx, Hyperlink, HyperlinkType, Paragraph, Pic, Run, Table, TableCell, TableRow};
use std::io::Cursor;

const BODY: &str = "Revenue grew in every region this quarter, led by the northern \
                    offices, while costs stayed flat thanks to the new supplier contracts.";

fn pack(docx: Docx) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    docx.build().pack(&mut buffer).expect("Failed to pack fixture");
    buffer.into_inner()
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(text_paragraph(text))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([40, 90, 160]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    png
}

/// Heading, body, blank line, source table, text table, body
fn report_fixture() -> Vec<u8> {
    let table = Table::new(vec![
        TableRow::new(vec![cell("Region"), cell("Sales")]),
        TableRow::new(vec![cell("North"), cell("120")]),
        TableRow::new(vec![cell("South"), cell("95")]),
    ]);
    let text_table = Paragraph::new().add_run(
        Run::new()
            .add_text("Name, Age, City")
            .add_break(BreakType::TextWrapping)
            .add_text("Alice, 30, NYC")
            .add_break(BreakType::TextWrapping)
            .add_text("Bob, 25, LA"),
    );

    pack(
        Docx::new()
            .add_paragraph(text_paragraph("Quarterly Report"))
            .add_paragraph(text_paragraph(BODY))
            .add_paragraph(Paragraph::new())
            .add_table(table)
            .add_paragraph(text_paragraph("   "))
            .add_paragraph(text_paragraph_bold_run())
            .add_paragraph(text_table),
    )
}

fn text_paragraph_bold_run() -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text("Costs were "))
        .add_run(Run::new().add_text("well under budget").bold())
        .add_run(Run::new().add_text(" for the third quarter in a row, which the board noted with approval."))
}

#[cfg(test)]
mod extraction_tests {
    use super::*;

    #[test]
    fn test_elements_follow_document_order() {
        let source = SourceDocument::from_bytes("report.docx", &report_fixture()).unwrap();
        let elements = extract(&source);

        let kinds: Vec<&str> = elements.iter().map(ContentElement::kind).collect();
        assert_eq!(kinds, vec!["paragraph", "paragraph", "table", "paragraph", "paragraph"]);

        match &elements[2] {
            ContentElement::Table(table) => {
                assert_eq!(table.row_count(), 3);
                assert_eq!(table.column_count(), 2);
                assert_eq!(table.cell_text(1, 0).as_deref(), Some("North"));
            }
            other => panic!("expected a table, got {}", other.kind()),
        }
    }

    #[test]
    fn test_run_formatting_is_kept() {
        let source = SourceDocument::from_bytes("report.docx", &report_fixture()).unwrap();
        let elements = extract(&source);
        let ContentElement::Paragraph(paragraph) = &elements[3] else {
            panic!("expected a paragraph");
        };
        assert!(paragraph.runs.iter().any(|run| run.formatting.bold && run.text == "well under budget"));
        assert!(paragraph.runs.iter().any(|run| !run.formatting.bold));
    }

    #[test]
    fn test_hyperlink_text_survives() {
        let fixture = pack(
            Docx::new()
                .add_paragraph(
                    Paragraph::new().add_run(Run::new().add_text("See ")).add_hyperlink(
                        Hyperlink::new("https://example.com/annual", HyperlinkType::External)
                            .add_run(Run::new().add_text("the annual report")),
                    ),
                )
                .add_paragraph(Paragraph::new().add_hyperlink(
                    Hyperlink::new("https://example.com/appendix", HyperlinkType::External)
                        .add_run(Run::new().add_text("Appendix B")),
                )),
        );

        let source = SourceDocument::from_bytes("links.docx", &fixture).unwrap();
        let elements = extract(&source);
        let texts: Vec<String> = elements
            .iter()
            .filter_map(|element| match element {
                ContentElement::Paragraph(paragraph) => Some(paragraph.text()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["See the annual report", "Appendix B"]);

        let rebuilt = reconstruct(&elements, &Template::default(), source.images());
        let reread = SourceDocument::from_bytes("processed_links.docx", &rebuilt.to_bytes().unwrap()).unwrap();
        assert_eq!(content_count(&extract(&reread)), content_count(&elements));
    }

    #[test]
    fn test_linked_image_stays_with_its_paragraph() {
        let fixture = pack(
            Docx::new()
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Logo link"))
                        .add_hyperlink(
                            Hyperlink::new("top", HyperlinkType::Anchor)
                                .add_run(Run::new().add_image(Pic::new(&png_bytes(6, 3)))),
                        ),
                )
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Figure two"))
                        .add_run(Run::new().add_image(Pic::new(&png_bytes(10, 5)))),
                ),
        );

        let source = SourceDocument::from_bytes("linked.docx", &fixture).unwrap();
        assert_eq!(source.images().len(), 2);

        let elements = extract(&source);
        let order: Vec<String> = elements
            .iter()
            .map(|element| match element {
                ContentElement::Paragraph(paragraph) => paragraph.text(),
                ContentElement::Image(image) => format!("image {}", image.anchor.sequence),
                ContentElement::Table(_) => "table".to_string(),
            })
            .collect();
        assert_eq!(order, vec!["Logo link", "image 0", "Figure two", "image 1"]);
    }
}

#[cfg(test)]
mod reconstruction_tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_content_count() {
        let source = SourceDocument::from_bytes("report.docx", &report_fixture()).unwrap();
        let elements = extract(&source);

        let rebuilt = reconstruct(&elements, &Template::default(), source.images());
        assert_eq!(rebuilt.summary.tables, 1);
        assert_eq!(rebuilt.summary.text_tables, 1);
        assert_eq!(rebuilt.summary.headings, 1);

        let bytes = rebuilt.to_bytes().unwrap();
        let reread = SourceDocument::from_bytes("processed_report.docx", &bytes).unwrap();
        let reextracted = extract(&reread);

        assert_eq!(content_count(&elements), content_count(&reextracted));
        let ContentElement::Paragraph(first) = &reextracted[0] else {
            panic!("expected the title paragraph first");
        };
        assert_eq!(first.text(), "Quarterly Report");
        // Headings come back bold and at 14pt
        assert!(first.runs.iter().all(|run| run.formatting.bold));
        assert_eq!(first.runs[0].formatting.font_size, Some(14.0));
    }

    #[test]
    fn test_centered_template_with_header_and_footer() {
        let template = Template {
            header_title: Some("House Style".into()),
            footer_text: Some("Internal".into()),
            heading_alignment: HeadingAlignment::Center,
            ..Template::default()
        };
        let source = SourceDocument::from_bytes("report.docx", &report_fixture()).unwrap();
        let bytes = reconstruct(&extract(&source), &template, source.images())
            .to_bytes()
            .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.iter().any(|name| name.starts_with("word/header")));
        assert!(names.iter().any(|name| name.starts_with("word/footer")));
        assert!(archive.by_name("word/document.xml").is_ok());
    }

    #[test]
    fn test_image_follows_its_paragraph() {
        let pic = Pic::new(&png_bytes(8, 4));
        let fixture = pack(
            Docx::new()
                .add_paragraph(text_paragraph("Overview"))
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Figure one shows the trend"))
                        .add_run(Run::new().add_image(pic)),
                ),
        );

        let source = SourceDocument::from_bytes("figures.docx", &fixture).unwrap();
        assert_eq!(source.images().len(), 1);

        let elements = extract(&source);
        let kinds: Vec<&str> = elements.iter().map(ContentElement::kind).collect();
        assert_eq!(kinds, vec!["paragraph", "paragraph", "image"]);

        let rebuilt = reconstruct(&elements, &Template::default(), source.images());
        assert_eq!(rebuilt.summary.images_placed, 1);
        assert_eq!(rebuilt.summary.images_appended, 0);
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;

    #[test]
    fn test_reconstruct_file_writes_output_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("figures.docx");
        let pic = Pic::new(&png_bytes(16, 16));
        std::fs::write(
            &input,
            pack(
                Docx::new()
                    .add_paragraph(text_paragraph("Appendix"))
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic))),
            ),
        )
        .unwrap();

        let output_dir = dir.path().join("out");
        std::fs::create_dir_all(&output_dir).unwrap();
        let output = reconstruct_file(&input, &Template::default(), &output_dir, None).unwrap();

        assert_eq!(output.output_name, "processed_figures.docx");
        assert!(output_dir.join("processed_figures.docx").is_file());
        assert_eq!(output.images_saved, 1);
        let saved = std::fs::read_dir(output_dir.join("images").join("figures")).unwrap().count();
        assert_eq!(saved, 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.docx");
        std::fs::write(&input, b"definitely not a zip archive").unwrap();

        let result = reconstruct_file(&input, &Template::default(), dir.path(), None);
        assert!(result.is_err());
        assert!(!dir.path().join("processed_broken.docx").exists());
    }
}
