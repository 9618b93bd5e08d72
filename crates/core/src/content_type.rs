//! Content-type/extension mapping for `/download`.

/// Resolve `(file_extension, media_type)` for a `PointCloudRequest.format`.
///
/// Falls back to `(".bin", "application/octet-stream")` for unknown or
/// absent formats, matching the table's `(default)` row.
pub fn resolve(format: Option<&str>) -> (&'static str, &'static str) {
    match format.map(str::to_lowercase).as_deref() {
        Some("pcd-ascii") => (".pcd", "text/plain"),
        Some("pcd-binary") => (".pcd", "application/octet-stream"),
        Some("lasv14") | Some("las") => (".las", "application/octet-stream"),
        Some("laz") => (".laz", "application/octet-stream"),
        Some("ply") | Some("ply-binary") => (".ply", "application/octet-stream"),
        Some("ply-ascii") => (".ply", "text/plain"),
        Some("xyz") => (".xyz", "text/plain"),
        Some("txt") => (".txt", "text/plain"),
        Some("csv") => (".csv", "text/csv"),
        _ => (".bin", "application/octet-stream"),
    }
}
