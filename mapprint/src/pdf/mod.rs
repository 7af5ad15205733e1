//! Minimal multi-page PDF container for page JPEGs
//!
//! Each page is one full-page image. JPEG bytes are embedded verbatim
//! (`/DCTDecode`), never re-encoded. Object numbers are fixed:
//!
//! ```text
//! 1        Catalog
//! 2        Pages
//! 3 + 3i   Page i
//! 4 + 3i   Content stream of page i
//! 5 + 3i   Image XObject of page i
//! ```
//!
//! The writer counts every byte it emits, so the xref table points exactly
//! at each `N 0 obj` token.

use std::io::{self, Write};

const PDF_HEADER: &[u8] = b"%PDF-1.3\n";
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const POINTS_PER_INCH: f64 = 72.0;

/// One page image to embed.
#[derive(Debug, Clone, Copy)]
pub struct PdfPage<'a> {
    /// Baseline RGB JPEG bytes.
    pub jpeg: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl PdfPage<'_> {
    fn page_id(index: usize) -> usize {
        3 + 3 * index
    }

    fn content_id(index: usize) -> usize {
        Self::page_id(index) + 1
    }

    fn image_id(index: usize) -> usize {
        Self::page_id(index) + 2
    }
}

/// Streams a PDF document to `W`, tracking byte offsets.
pub struct PdfWriter<W: Write> {
    writer: W,
    resolution: f64,
    offset: usize,
    /// Indexed by object id; 0 is the free object.
    offsets: Vec<usize>,
}

impl<W: Write> PdfWriter<W> {
    /// `resolution` is the DPI the page rasters were rendered at.
    pub fn new(writer: W, resolution: f64) -> Self {
        Self {
            writer,
            resolution,
            offset: 0,
            offsets: Vec::new(),
        }
    }

    /// Writes the complete document and returns the underlying writer.
    pub fn write_document(mut self, pages: &[PdfPage<'_>]) -> io::Result<W> {
        self.offsets = vec![0; 3 + 3 * pages.len()];
        self.write_bytes(PDF_HEADER)?;

        self.write_object(CATALOG_ID, &format!("<< /Type /Catalog\n/Pages {} 0 R\n>>", PAGES_ID))?;

        let kids = (0..pages.len())
            .map(|i| format!("{} 0 R", PdfPage::page_id(i)))
            .collect::<Vec<_>>()
            .join(" ");
        self.write_object(
            PAGES_ID,
            &format!(
                "<< /Type /Pages\n/Kids [ {} ]\n/Count {}\n>>",
                kids,
                pages.len()
            ),
        )?;

        for (index, page) in pages.iter().enumerate() {
            self.write_page(index, page)?;
        }

        self.write_trailer()?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_page(&mut self, index: usize, page: &PdfPage<'_>) -> io::Result<()> {
        let width = self.to_points(page.width);
        let height = self.to_points(page.height);
        let rotate = if width > height { 90 } else { 0 };

        self.write_object(
            PdfPage::page_id(index),
            &format!(
                "<< /Type /Page\n/Parent {parent} 0 R\n/MediaBox [0 0 {w} {h}]\n\
                 /Contents {contents} 0 R\n/Rotate {rotate}\n/Resources <<\n\
                 /XObject << /Im{index} {image} 0 R >>\n/ProcSet [ /PDF /Text /ImageC ]\n>>\n>>",
                parent = PAGES_ID,
                w = fmt_number(width),
                h = fmt_number(height),
                contents = PdfPage::content_id(index),
                rotate = rotate,
                index = index,
                image = PdfPage::image_id(index),
            ),
        )?;

        let contents = format!(
            "q\n{} 0 0 {} 0 0 cm\n/Im{} Do\nQ",
            fmt_number(width),
            fmt_number(height),
            index
        );
        self.write_stream(
            PdfPage::content_id(index),
            &format!("<< /Length {} >>", contents.len()),
            contents.as_bytes(),
        )?;

        self.write_stream(
            PdfPage::image_id(index),
            &format!(
                "<< /Type /XObject\n/Subtype /Image\n/Name /Im{}\n/Filter [ /DCTDecode ]\n\
                 /Width {}\n/Height {}\n/ColorSpace /DeviceRGB\n/BitsPerComponent 8\n/Length {}\n>>",
                index,
                page.width,
                page.height,
                page.jpeg.len()
            ),
            page.jpeg,
        )
    }

    fn write_trailer(&mut self) -> io::Result<()> {
        let xref_start = self.offset;
        let count = self.offsets.len();

        self.write_str(&format!("xref\n0 {}\n", count))?;
        self.write_bytes(b"0000000000 65535 f \n")?;
        for id in 1..count {
            let entry = format!("{:010} 00000 n \n", self.offsets[id]);
            self.write_str(&entry)?;
        }
        self.write_str(&format!(
            "trailer\n<< /Root {} 0 R\n/Size {}\n>>\nstartxref\n{}\n%%EOF\n",
            CATALOG_ID, count, xref_start
        ))
    }

    fn write_object(&mut self, id: usize, body: &str) -> io::Result<()> {
        self.begin_object(id)?;
        self.write_str(body)?;
        self.write_bytes(b"\nendobj\n")
    }

    /// `dict` must carry the exact `/Length` of `data`.
    fn write_stream(&mut self, id: usize, dict: &str, data: &[u8]) -> io::Result<()> {
        self.begin_object(id)?;
        self.write_str(dict)?;
        self.write_bytes(b"\nstream\n")?;
        self.write_bytes(data)?;
        self.write_bytes(b"\nendstream\nendobj\n")
    }

    fn begin_object(&mut self, id: usize) -> io::Result<()> {
        if let Some(slot) = self.offsets.get_mut(id) {
            *slot = self.offset;
        }
        self.write_str(&format!("{} 0 obj\n", id))
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.offset += data.len();
        Ok(())
    }

    fn write_str(&mut self, data: &str) -> io::Result<()> {
        self.write_bytes(data.as_bytes())
    }

    fn to_points(&self, pixels: u32) -> f64 {
        pixels as f64 / self.resolution * POINTS_PER_INCH
    }
}

/// Builds a PDF in memory.
pub fn make_pdf(pages: &[PdfPage<'_>], resolution: f64) -> io::Result<Vec<u8>> {
    PdfWriter::new(Vec::new(), resolution).write_document(pages)
}

/// Formats a PDF number: integers without a fraction, others with at most
/// four decimals.
fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }
    let s = format!("{:.4}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
