#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// A raw 8-bit image drawn on a fixture page.
pub struct FixtureImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
}

impl FixtureImage {
    fn components(&self) -> usize {
        if self.color_space == "DeviceRGB" { 3 } else { 1 }
    }

    fn samples(&self) -> Vec<u8> {
        let len = self.width as usize * self.height as usize * self.components();
        (0..len).map(|index| u8::try_from(index % 251).unwrap_or(0)).collect()
    }
}

pub struct FixturePage<'a> {
    pub lines: Vec<&'a str>,
    pub images: Vec<FixtureImage>,
}

impl<'a> FixturePage<'a> {
    pub fn text(lines: Vec<&'a str>) -> Self {
        Self {
            lines,
            images: Vec::new(),
        }
    }
}

pub fn create_test_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let pages = pages
        .iter()
        .map(|lines| FixturePage::text(lines.clone()))
        .collect::<Vec<_>>();
    create_test_pdf_with_images(path, &pages)
}

pub fn create_test_pdf_with_images(
    path: &Path,
    pages: &[FixturePage<'_>],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut page_ids = Vec::new();

    for page in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![16.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];

        for (index, line) in page.lines.iter().enumerate() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            if index + 1 < page.lines.len() {
                operations.push(Operation::new("T*", vec![]));
            }
        }
        operations.push(Operation::new("ET", vec![]));

        let mut xobjects = Dictionary::new();
        for (index, image) in page.images.iter().enumerate() {
            let name = format!("Im{}", index + 1);
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => image.color_space,
                    "BitsPerComponent" => 8,
                },
                image.samples(),
            ));
            xobjects.set(name.as_bytes().to_vec(), image_id);

            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        i64::from(image.width).into(),
                        0.into(),
                        0.into(),
                        i64::from(image.height).into(),
                        50.into(),
                        100.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                Operation::new("Q", vec![]),
            ]);
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
            "XObject" => xobjects,
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}
