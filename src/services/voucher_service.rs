// src/services/voucher_service.rs

use std::path::{Path, PathBuf};

use chrono::Utc;
use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::loyalty::{Coupon, RewardType},
    services::loyalty_service::LoyaltyService,
};

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

/// QR code com o código do cupom, pronto para o PDF.
pub fn coupon_qr_image(code: &str) -> Result<image::DynamicImage, AppError> {
    let qr = QrCode::new(code.as_bytes()).map_err(render_error)?;
    let buffer = qr.render::<Luma<u8>>().min_dimensions(240, 240).build();
    Ok(image::DynamicImage::ImageLuma8(buffer))
}

/// Texto do benefício para o voucher.
pub fn reward_label(coupon: &Coupon) -> String {
    match coupon.reward_type {
        RewardType::PercentageDiscount => format!("{} ({}% de desconto)", coupon.reward_name, coupon.reward_value.normalize()),
        RewardType::FixedDiscount => format!("{} (R$ {:.2} de desconto)", coupon.reward_name, coupon.reward_value),
        RewardType::Gift => coupon.reward_name.clone(),
    }
}

#[derive(Clone)]
pub struct VoucherService {
    loyalty: LoyaltyService,
    tenant_repo: TenantRepository,
    fonts_dir: PathBuf,
}

impl VoucherService {
    pub fn new(loyalty: LoyaltyService, tenant_repo: TenantRepository, fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            loyalty,
            tenant_repo,
            fonts_dir: fonts_dir.into(),
        }
    }

    /// PDF do cupom: nome da loja, benefício, validade e QR com o código.
    pub async fn generate_voucher(&self, tenant_id: Uuid, coupon_id: Uuid) -> Result<(String, Vec<u8>), AppError> {
        let coupon = self.loyalty.get_coupon(tenant_id, coupon_id).await?;
        let tenant = self.tenant_repo.find_by_id(tenant_id).await?;

        let fonts_dir = self.fonts_dir.clone();
        let code = coupon.code.clone();

        // genpdf é síncrono e pesado
        let pdf = tokio::task::spawn_blocking(move || render_voucher(&fonts_dir, &tenant.name, &coupon))
            .await
            .map_err(render_error)??;

        Ok((code, pdf))
    }
}

fn render_voucher(fonts_dir: &Path, tenant_name: &str, coupon: &Coupon) -> Result<Vec<u8>, AppError> {
    let font_family = genpdf::fonts::from_files(fonts_dir, "Roboto", None)
        .map_err(|_| AppError::FontNotFound(fonts_dir.display().to_string()))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Cupom {}", coupon.code));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(elements::Paragraph::new(tenant_name).styled(style::Style::new().bold().with_font_size(20)));
    doc.push(elements::Break::new(1.5));

    doc.push(
        elements::Paragraph::new(format!("Olá, {}!", coupon.client_name))
            .styled(style::Style::new().with_font_size(12)),
    );
    doc.push(elements::Paragraph::new("Obrigado pela sua avaliação. Aqui está o seu cupom:"));
    doc.push(elements::Break::new(1));

    doc.push(elements::Paragraph::new(reward_label(coupon)).styled(style::Style::new().bold().with_font_size(14)));
    doc.push(elements::Break::new(1));

    // --- DADOS DO CUPOM ---
    let mut table = elements::TableLayout::new(vec![1, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    let bold = style::Style::new().bold();

    let rows = [
        ("Código", coupon.code.clone()),
        ("Válido a partir de", coupon.valid_from.format("%d/%m/%Y %H:%M").to_string()),
        ("Válido até", coupon.expires_at.format("%d/%m/%Y %H:%M").to_string()),
        ("Situação", coupon.effective_status(Utc::now()).as_str().to_string()),
    ];
    for (label, value) in rows {
        table
            .row()
            .element(elements::Paragraph::new(label).styled(bold))
            .element(elements::Paragraph::new(value))
            .push()
            .map_err(render_error)?;
    }
    doc.push(table);
    doc.push(elements::Break::new(2));

    // --- QR CODE ---
    let qr = elements::Image::from_dynamic_image(coupon_qr_image(&coupon.code)?)
        .map_err(render_error)?
        .with_alignment(genpdf::Alignment::Center)
        .with_scale(genpdf::Scale::new(0.5, 0.5));
    doc.push(qr);

    doc.push(elements::Break::new(1));
    let mut footer = elements::Paragraph::new("Apresente este cupom no caixa.");
    footer.set_alignment(genpdf::Alignment::Center);
    doc.push(footer.styled(style::Style::new().italic().with_font_size(9)));

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(render_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use rust_decimal::Decimal;

    fn coupon(reward_type: RewardType, value: Decimal) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            code: "K7QM2XPA".into(),
            status: crate::models::loyalty::CouponStatus::Active,
            reward_id: Uuid::new_v4(),
            reward_name: "Desconto".into(),
            reward_type,
            reward_value: value,
            client_id: Uuid::new_v4(),
            client_name: "Ana".into(),
            client_phone: "11999990000".into(),
            response_id: None,
            valid_from: now,
            expires_at: now,
            used_at: None,
            used_by: None,
            canceled_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn qr_image_is_generated_for_code() {
        let image = coupon_qr_image("K7QM2XPA").unwrap();
        assert!(image.width() >= 240);
    }

    #[test]
    fn reward_label_reflects_type() {
        assert_eq!(
            reward_label(&coupon(RewardType::PercentageDiscount, Decimal::new(1000, 2))),
            "Desconto (10% de desconto)"
        );
        assert_eq!(
            reward_label(&coupon(RewardType::FixedDiscount, Decimal::new(15, 0))),
            "Desconto (R$ 15.00 de desconto)"
        );
        assert_eq!(reward_label(&coupon(RewardType::Gift, Decimal::ZERO)), "Desconto");
    }

    #[test]
    fn missing_fonts_directory_is_reported() {
        let dir = PathBuf::from("/caminho/que/nao/existe");
        let result = render_voucher(&dir, "Loja", &coupon(RewardType::Gift, Decimal::ZERO));
        assert!(matches!(result, Err(AppError::FontNotFound(_))));
    }
}
