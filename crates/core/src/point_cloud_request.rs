//! `PointCloudRequest` — pure validation, no I/O.
//!
//! Validation is kept separate from submission so it is callable from tests without touching the
//! filesystem, the catalog, or the cluster.

use crate::error::RequestError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

const ALLOWED_FORMATS: &[&str] = &["pcd-ascii", "lasv14", "pcd-bin", "lasv13", "lasv12"];
const DATA_ROOT: &str = "/data";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointCloudRequest {
    pub file_path: String,
    #[serde(default)]
    pub remove_attribute: Vec<String>,
    #[serde(default)]
    pub remove_all_attributes: bool,
    #[serde(default)]
    pub remove_color: bool,
    pub format: Option<String>,
    pub line: Option<i64>,
    pub returns: Option<i64>,
    pub number: Option<i64>,
    pub density: Option<f64>,
    pub roi: Option<[f64; 9]>,
    pub outcrs: Option<String>,
    pub incrs: Option<String>,
}

/// A request that has passed validation; `file_path` is normalized to
/// `/data/<suffix>`.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub file_path: String,
    pub format: Option<String>,
    inner: PointCloudRequest,
}

impl ValidatedRequest {
    /// Render the CLI argument vector the processing container expects.
    pub fn to_cli_arguments(&self) -> Vec<String> {
        let mut args = vec![self.file_path.clone()];

        for attr in &self.inner.remove_attribute {
            args.push("--remove_attribute".to_string());
            args.push(attr.clone());
        }
        if self.inner.remove_all_attributes {
            args.push("--remove_all_attributes".to_string());
        }
        if self.inner.remove_color {
            args.push("--remove_color".to_string());
        }
        if let Some(format) = &self.format {
            args.push(format!("-f={}", format));
        }
        if let Some(line) = self.inner.line {
            args.push(format!("-l={}", line));
        }
        if let Some(returns) = self.inner.returns {
            args.push(format!("-r={}", returns));
        }
        if let Some(number) = self.inner.number {
            args.push(format!("-n={}", number));
        }
        if let Some(density) = self.inner.density {
            args.push(format!("-d={}", density));
        }
        if let Some(roi) = self.inner.roi {
            let joined = roi.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
            args.push(format!("--roi={}", joined));
        }
        if let Some(outcrs) = &self.inner.outcrs {
            args.push(format!("--outcrs={}", outcrs));
        }
        if let Some(incrs) = &self.inner.incrs {
            args.push(format!("--incrs={}", incrs));
        }

        args
    }
}

impl PointCloudRequest {
    /// Validate this request against the field constraint table.
    ///
    /// `ValueError` is returned for the path-escape case; everything else
    /// that fails its type/range constraint is a `ValidationError`.
    pub fn validate(self) -> Result<ValidatedRequest, RequestError> {
        let normalized_path = normalize_under_data_root(&self.file_path)?;

        if let Some(format) = &self.format {
            if !ALLOWED_FORMATS.contains(&format.as_str()) {
                return Err(RequestError::Validation(format!(
                    "format must be one of {:?}, got {:?}",
                    ALLOWED_FORMATS, format
                )));
            }
        }
        if let Some(line) = self.line {
            if line < 0 {
                return Err(RequestError::Validation("line must be >= 0".to_string()));
            }
        }
        if let Some(returns) = self.returns {
            if returns < -1 {
                return Err(RequestError::Validation("returns must be >= -1".to_string()));
            }
        }
        if let Some(number) = self.number {
            if number < -1 {
                return Err(RequestError::Validation("number must be >= -1".to_string()));
            }
        }
        if let Some(density) = self.density {
            if density <= 0.0 || density.is_nan() {
                return Err(RequestError::Validation("density must be > 0".to_string()));
            }
        }
        for (name, crs) in [("outcrs", &self.outcrs), ("incrs", &self.incrs)] {
            if let Some(crs) = crs {
                if !crs.starts_with("EPSG:") {
                    return Err(RequestError::Validation(format!(
                        "{} must start with \"EPSG:\", got {:?}",
                        name, crs
                    )));
                }
            }
        }

        let format = self.format.clone();
        Ok(ValidatedRequest { file_path: normalized_path, format, inner: self })
    }
}

/// Resolve `file_path` under `/data`, rejecting any escape.
fn normalize_under_data_root(file_path: &str) -> Result<String, RequestError> {
    let path = Path::new(file_path);
    if !path.is_absolute() {
        return Err(RequestError::Value(format!("file_path must be absolute, got {:?}", file_path)));
    }

    // Reject any `..` component outright; component-wise prefix match below
    // then guarantees the resolved path cannot climb back out of /data.
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(RequestError::Value(format!("file_path must not contain \"..\": {:?}", file_path)));
    }

    let data_root = Path::new(DATA_ROOT);
    let suffix = path.strip_prefix(data_root).map_err(|_| {
        RequestError::Value(format!("file_path must resolve under {}, got {:?}", DATA_ROOT, file_path))
    })?;

    Ok(format!("{}/{}", DATA_ROOT, suffix.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> PointCloudRequest {
        PointCloudRequest { file_path: "/data/a.las".to_string(), ..Default::default() }
    }

    #[test]
    fn path_escape_is_rejected() {
        let req = PointCloudRequest { file_path: "/etc/passwd".to_string(), ..Default::default() };
        let err = req.validate().unwrap_err();
        assert_eq!(err.error_type(), "value_error");
    }

    #[test]
    fn path_traversal_is_rejected() {
        let req = PointCloudRequest { file_path: "/data/../etc/passwd".to_string(), ..Default::default() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn minimal_request_emits_positional_arg_only() {
        let validated = base_request().validate().unwrap();
        assert_eq!(validated.to_cli_arguments(), vec!["/data/a.las".to_string()]);
    }

    #[test]
    fn full_request_emits_all_flags_in_order() {
        let req = PointCloudRequest {
            file_path: "/data/a.las".to_string(),
            remove_attribute: vec!["intensity".to_string()],
            remove_all_attributes: true,
            remove_color: true,
            format: Some("lasv14".to_string()),
            line: Some(1),
            returns: Some(-1),
            number: Some(2),
            density: Some(0.5),
            roi: Some([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
            outcrs: Some("EPSG:4326".to_string()),
            incrs: Some("EPSG:2056".to_string()),
        };
        let validated = req.validate().unwrap();
        assert_eq!(
            validated.to_cli_arguments(),
            vec![
                "/data/a.las".to_string(),
                "--remove_attribute".to_string(),
                "intensity".to_string(),
                "--remove_all_attributes".to_string(),
                "--remove_color".to_string(),
                "-f=lasv14".to_string(),
                "-l=1".to_string(),
                "-r=-1".to_string(),
                "-n=2".to_string(),
                "-d=0.5".to_string(),
                "--roi=0,1,2,3,4,5,6,7,8".to_string(),
                "--outcrs=EPSG:4326".to_string(),
                "--incrs=EPSG:2056".to_string(),
            ]
        );
    }

    #[test]
    fn invalid_format_is_rejected() {
        let req = PointCloudRequest { format: Some("bogus".to_string()), ..base_request() };
        assert_eq!(req.validate().unwrap_err().error_type(), "validation_error");
    }

    #[test]
    fn negative_line_is_rejected() {
        let req = PointCloudRequest { line: Some(-1), ..base_request() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn returns_allows_negative_one_sentinel() {
        let req = PointCloudRequest { returns: Some(-1), ..base_request() };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn non_positive_density_is_rejected() {
        let req = PointCloudRequest { density: Some(0.0), ..base_request() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn crs_must_start_with_epsg_prefix() {
        let req = PointCloudRequest { outcrs: Some("4326".to_string()), ..base_request() };
        assert!(req.validate().is_err());
    }
}
