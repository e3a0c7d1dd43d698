//! Reference template generation from labeled sample documents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::scan_folder;
use crate::error::Result;
use crate::pdf::Rasterizer;
use crate::registry::{full_page_file_name, template_file_name, SupplierRegistry};

/// One template written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedTemplate {
    pub supplier: String,
    pub sample: PathBuf,
    pub template: PathBuf,
    pub full_page: PathBuf,
}

/// What a template generation run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateReport {
    pub generated: Vec<GeneratedTemplate>,
    /// Suppliers whose sample could not be turned into a template.
    pub failed: Vec<(String, String)>,
    /// Sample files no supplier identity could be found in.
    pub unassigned: Vec<PathBuf>,
}

/// Build `{identity}_template.png` and `{identity}_full.png` for every
/// supplier with a sample in `samples`.
///
/// Samples are assigned to the longest supplier identity contained in
/// their lower-cased file name; the first sample (by name) of each supplier
/// is used.
pub fn generate_templates(
    samples: &Path,
    output: &Path,
    registry: &SupplierRegistry,
    rasterizer: &dyn Rasterizer,
) -> Result<TemplateReport> {
    std::fs::create_dir_all(output)?;
    let mut report = TemplateReport::default();

    let mut by_supplier: BTreeMap<&str, PathBuf> = BTreeMap::new();
    for path in scan_folder(samples)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let owner = registry
            .iter()
            .filter(|p| p.header_region.is_some() && name.contains(p.identity.as_str()))
            .max_by_key(|p| p.identity.len());
        match owner {
            Some(profile) => {
                by_supplier.entry(profile.identity.as_str()).or_insert(path);
            }
            None => report.unassigned.push(path),
        }
    }

    for profile in registry.iter().filter(|p| p.header_region.is_some()) {
        let Some(sample) = by_supplier.get(profile.identity.as_str()) else {
            debug!("No sample found for {}", profile.identity);
            continue;
        };
        let Some(region) = profile.header_region else {
            continue;
        };
        info!("Generating template for {} from {}", profile.identity, sample.display());

        let page = match rasterizer.rasterize(sample) {
            Ok(page) => page,
            Err(e) => {
                error!("Failed to rasterize {}: {}", sample.display(), e);
                report.failed.push((profile.identity.clone(), e.to_string()));
                continue;
            }
        };
        let Some(page_image) = page.image else {
            warn!("{} has no scanned page image", sample.display());
            report
                .failed
                .push((profile.identity.clone(), "no page image".to_string()));
            continue;
        };

        let (width, height) = page_image.dimensions();
        let Some(clipped) = region.clip(width, height) else {
            report.failed.push((
                profile.identity.clone(),
                format!("header region outside {}x{} page", width, height),
            ));
            continue;
        };

        let gray = page_image.to_luma8();
        let header = image::imageops::crop_imm(&gray, clipped.x, clipped.y, clipped.width, clipped.height)
            .to_image();
        let template = output.join(template_file_name(&profile.identity));
        let full_page = output.join(full_page_file_name(&profile.identity));
        let saved = header
            .save(&template)
            .and_then(|_| page_image.save(&full_page));
        if let Err(e) = saved {
            warn!("Failed to save template for {}: {}", profile.identity, e);
            report.failed.push((profile.identity.clone(), e.to_string()));
            continue;
        }
        info!("Saved template {}", template.display());

        report.generated.push(GeneratedTemplate {
            supplier: profile.identity.clone(),
            sample: sample.clone(),
            template,
            full_page,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::pdf::RasterizedPage;
    use image::{DynamicImage, GrayImage, Luma};
    use pretty_assertions::assert_eq;

    /// Returns the same synthetic page for every file; fails on "broken".
    struct SyntheticPages;

    impl Rasterizer for SyntheticPages {
        fn rasterize(&self, path: &Path) -> crate::pdf::Result<RasterizedPage> {
            if path.to_string_lossy().contains("broken") {
                return Err(PdfError::Parse("broken sample".to_string()));
            }
            let page = GrayImage::from_fn(600, 800, |x, y| Luma([((x + y) % 256) as u8]));
            Ok(RasterizedPage {
                image: Some(DynamicImage::ImageLuma8(page)),
                embedded_text: None,
            })
        }
    }

    #[test]
    fn test_generate_templates() {
        let samples = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in [
            "soares_2025_01.pdf",
            "soares_2025_02.pdf",
            "Teofilo_GD_sample.pdf",
            "broken_lidl.pdf",
            "unknown.pdf",
        ] {
            std::fs::write(samples.path().join(name), b"%PDF").unwrap();
        }

        let registry = SupplierRegistry::builtin().unwrap();
        let report = generate_templates(samples.path(), output.path(), &registry, &SyntheticPages).unwrap();

        let generated: Vec<&str> = report.generated.iter().map(|g| g.supplier.as_str()).collect();
        assert_eq!(generated, vec!["soares", "teofilo_gd"]);
        assert!(report.generated[0].sample.ends_with("soares_2025_01.pdf"));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "lidl");
        assert_eq!(report.unassigned.len(), 1);

        let template = image::open(output.path().join("soares_template.png")).unwrap();
        assert_eq!(template.dimensions(), (300, 150));
        assert!(output.path().join("soares_full.png").exists());
    }

    #[test]
    fn test_save_failure_does_not_stop_other_suppliers() {
        let samples = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in ["soares_2025_01.pdf", "teofilo_gd_2025.pdf"] {
            std::fs::write(samples.path().join(name), b"%PDF").unwrap();
        }
        // A directory where the Soares template should be written.
        std::fs::create_dir(output.path().join("soares_template.png")).unwrap();

        let registry = SupplierRegistry::builtin().unwrap();
        let report = generate_templates(samples.path(), output.path(), &registry, &SyntheticPages).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "soares");
        let generated: Vec<&str> = report.generated.iter().map(|g| g.supplier.as_str()).collect();
        assert_eq!(generated, vec!["teofilo_gd"]);
        assert!(output.path().join("teofilo_gd_template.png").exists());
    }
}
