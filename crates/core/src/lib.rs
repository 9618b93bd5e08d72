//! Domain types shared by every `lidar-*` crate: the catalog record shapes,
//! job status/patch, the point-cloud request contract, and a `Clock`
//! abstraction so nothing downstream calls wall-clock time directly.
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod catalog_record;
pub mod clock;
pub mod content_type;
pub mod error;
pub mod id;
pub mod job_status;
pub mod point_cloud_request;

pub use catalog_record::{archive_output_path, folder_key, FolderRecord, MissionMetacloudRecord, ProcessingStatus};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ErrorResponse, RequestError};
pub use id::{batch_job_name, single_job_name, unique_output_filename};
pub use job_status::{JobPhase, JobStatus, JobStatusPatch};
pub use point_cloud_request::{PointCloudRequest, ValidatedRequest};
