//! Merge `{n}.jpg` captures into one PDF, one image per page.
//!
//! Each image is first written as a single-page PDF beside it
//! (`{n}.jpg.pdf`), then appended to the cumulative document and removed.

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::storage::list_captures;

/// Suffix of the per-image intermediate PDF.
pub const UNIT_SUFFIX: &str = ".pdf";

/// Images are placed at this resolution.
const IMAGE_DPI: f32 = 100.0;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("malformed page unit: {0}")]
    MalformedUnit(String),

    #[error("assembly task failed: {0}")]
    Task(String),
}

/// Page size in points for a raster of `px` pixels.
fn points(px: u32) -> f32 {
    px as f32 * 72.0 / IMAGE_DPI
}

/// Render one image into a standalone single-page PDF.
fn render_unit(image_path: &Path, unit_path: &Path) -> Result<(), AssemblyError> {
    let rgb = image::open(image_path)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(
        &mut Cursor::new(&mut jpeg),
        JPEG_QUALITY,
    ))?;

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let (w, h) = (points(width), points(height));
    let content = format!("q {w:.2} 0 0 {h:.2} 0 0 cm /Im0 Do Q");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! {
            "Im0" => image_id,
        },
    });

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(unit_path)?;
    Ok(())
}

/// Cumulative output document.
struct Merger {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Merger {
    fn new() -> Self {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Append every page of the unit at `unit_path`.
    fn append(&mut self, unit_path: &Path) -> Result<usize, AssemblyError> {
        let mut unit = Document::load(unit_path)?;
        unit.renumber_objects_with(self.doc.max_id + 1);

        let catalog_id = unit.trailer.get(b"Root")?.as_reference()?;
        let unit_pages_id = unit
            .get_object(catalog_id)?
            .as_dict()?
            .get(b"Pages")?
            .as_reference()?;
        let pages: BTreeMap<u32, ObjectId> = unit.get_pages();
        if pages.is_empty() {
            return Err(AssemblyError::MalformedUnit(unit_path.display().to_string()));
        }

        let max_id = unit.max_id;
        for (id, object) in unit.objects {
            if id == catalog_id || id == unit_pages_id {
                continue;
            }
            self.doc.objects.insert(id, object);
        }
        self.doc.max_id = self.doc.max_id.max(max_id);

        for page_id in pages.values() {
            self.doc
                .get_object_mut(*page_id)?
                .as_dict_mut()?
                .set("Parent", self.pages_id);
            self.kids.push(*page_id);
        }
        Ok(pages.len())
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn save(mut self, path: &Path) -> Result<(), AssemblyError> {
        let count = self.kids.len() as i64;
        let kids: Vec<Object> = self.kids.into_iter().map(Object::from).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.doc.save(path)?;
        Ok(())
    }
}

fn unit_path_for(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_os_string();
    name.push(UNIT_SUFFIX);
    PathBuf::from(name)
}

/// Build `output` from the captures in `images_folder`, in numeric order.
///
/// An image that cannot be rendered or appended is left out. Returns `None`,
/// writing nothing, when no page made it in.
pub fn assemble_document_blocking(
    images_folder: &Path,
    output: &Path,
) -> Result<Option<PathBuf>, AssemblyError> {
    let captures = list_captures(images_folder)?;
    let mut merger = Merger::new();

    for (n, image_path) in &captures {
        let unit_path = unit_path_for(image_path);
        let appended = render_unit(image_path, &unit_path).and_then(|()| merger.append(&unit_path));
        if unit_path.exists() {
            if let Err(e) = fs::remove_file(&unit_path) {
                warn!("Could not remove {}: {}", unit_path.display(), e);
            }
        }
        match appended {
            Ok(pages) => debug!("Appended {} ({} page)", n, pages),
            Err(e) => warn!("Leaving out image {}: {}", image_path.display(), e),
        }
    }

    if merger.page_count() == 0 {
        info!("No pages to assemble in {}", images_folder.display());
        return Ok(None);
    }

    let pages = merger.page_count();
    merger.save(output)?;
    info!("Wrote {} ({} pages)", output.display(), pages);
    Ok(Some(output.to_path_buf()))
}

/// Async wrapper running assembly on the blocking pool.
pub async fn assemble_document(
    images_folder: &Path,
    output: &Path,
) -> Result<Option<PathBuf>, AssemblyError> {
    let images_folder = images_folder.to_path_buf();
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || assemble_document_blocking(&images_folder, &output))
        .await
        .map_err(|e| AssemblyError::Task(e.to_string()))?
}
