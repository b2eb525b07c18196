// src/services/pdf_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;

use crate::{
    common::error::AppError,
    models::billing::{DocumentDetail, TaxDocument},
};

/// Nome do arquivo para download: `<folio>_<cliente>.pdf`, trocando tudo que
/// não for `[A-Za-z0-9_-]` por `_`.
pub fn download_filename(detail: &DocumentDetail) -> String {
    let stem: String = format!("{}_{}", detail.document.number, detail.customer_name)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{}.pdf", stem)
}

/// Conteúdo do QR impresso em documentos já enviados.
pub fn qr_payload(document: &TaxDocument) -> Option<String> {
    document
        .sii_track_id
        .as_ref()
        .map(|track_id| format!("{}|{}|{}|{}", document.number, document.issue_date, document.total, track_id))
}

#[derive(Clone)]
pub struct PdfService {
    fonts_dir: PathBuf,
    font_family: String,
    company_name: Option<String>,
}

impl PdfService {
    pub fn new(fonts_dir: impl Into<PathBuf>, font_family: impl Into<String>, company_name: Option<String>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            font_family: font_family.into(),
            company_name,
        }
    }

    pub fn render_document(&self, detail: &DocumentDetail) -> Result<Vec<u8>, AppError> {
        let document = &detail.document;

        // 1. Configura o PDF com a fonte da pasta configurada
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, &self.font_family, None)
            .map_err(|e| {
                AppError::RenderError(format!(
                    "fonte '{}' não encontrada em {}: {}",
                    self.font_family,
                    self.fonts_dir.display(),
                    e
                ))
            })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("{} {}", document.doc_type.label(), document.number));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        if let Some(company) = &self.company_name {
            doc.push(elements::Paragraph::new(company.as_str())
                .styled(style::Style::new().bold().with_font_size(18)));
            doc.push(elements::Break::new(1.5));
        }

        doc.push(elements::Paragraph::new(format!("{} N° {}", document.doc_type.label().to_uppercase(), document.number))
            .styled(style::Style::new().bold().with_font_size(14)));

        doc.push(elements::Paragraph::new(format!("Emisión: {}", document.issue_date.format("%d/%m/%Y"))));
        doc.push(elements::Paragraph::new(format!("Vencimiento: {}", document.due_date.format("%d/%m/%Y"))));
        doc.push(elements::Paragraph::new(format!("Cliente: {}", detail.customer_name)));

        doc.push(elements::Break::new(2));

        // --- TABELA DE ITENS ---
        // Pesos das colunas: Descrição (4), Qtd (1), Preço (2), Total (2)
        let mut table = elements::TableLayout::new(vec![4, 1, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let style_bold = style::Style::new().bold();
        table.row()
            .element(elements::Paragraph::new("Descripción").styled(style_bold))
            .element(elements::Paragraph::new("Cant.").styled(style_bold))
            .element(elements::Paragraph::new("Unitario").styled(style_bold))
            .element(elements::Paragraph::new("Total").styled(style_bold))
            .push()
            .map_err(|e| AppError::RenderError(e.to_string()))?;

        for item in &detail.items {
            table.row()
                .element(elements::Paragraph::new(item.description.as_str()))
                .element(elements::Paragraph::new(item.quantity.normalize().to_string()))
                .element(elements::Paragraph::new(format!("$ {:.2}", item.unit_price)))
                .element(elements::Paragraph::new(format!("$ {:.2}", item.total)))
                .push()
                .map_err(|e| AppError::RenderError(e.to_string()))?;
        }

        doc.push(table);
        doc.push(elements::Break::new(2));

        // --- TOTAIS ---
        for (label, value, bold) in [
            ("Neto", document.subtotal, false),
            ("IVA (19%)", document.tax_amount, false),
            ("TOTAL", document.total, true),
        ] {
            let mut paragraph = elements::Paragraph::new(format!("{}: $ {:.2}", label, value));
            paragraph.set_alignment(genpdf::Alignment::Right);
            let style = if bold { style::Style::new().bold().with_font_size(12) } else { style::Style::new() };
            doc.push(paragraph.styled(style));
        }

        // --- TIMBRE (QR) ---
        if let Some(payload) = qr_payload(document) {
            doc.push(elements::Break::new(2));

            let code = QrCode::new(payload.as_bytes())
                .map_err(|e| AppError::RenderError(e.to_string()))?;

            let image_buffer = code.render::<Luma<u8>>().build();
            let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

            let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
                .map_err(|e| AppError::RenderError(e.to_string()))?
                .with_scale(genpdf::Scale::new(0.5, 0.5));

            doc.push(pdf_image);
            if let Some(track_id) = &document.sii_track_id {
                doc.push(elements::Paragraph::new(format!("Track ID: {}", track_id))
                    .styled(style::Style::new().with_font_size(8)));
            }
        }

        // 2. Renderiza para buffer em memória
        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::RenderError(e.to_string()))?;

        tracing::debug!(number = %document.number, bytes = buffer.len(), "PDF gerado");
        Ok(buffer)
    }
}
