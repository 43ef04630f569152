#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Meshing
//!
//! A chunk meshing subsystem for voxel worlds: converts cuboids of voxel data
//! into renderable triangle geometry and schedules rebuilds across a pool of
//! background worker threads without ever touching the GPU off the render
//! thread.
//!
//! ## Key Modules
//!
//! * `voxels` - Voxel and chunk storage plus the padded neighborhood view
//!   consumed during a compile
//! * `content` - Read-only block definitions, texture atlas regions and
//!   rotation profiles
//! * `lighting` - Packed 4-channel light values and the sampler contract
//! * `meshing` - The mesh compiler, vertex format, and the scheduler that
//!   owns the mesh cache
//! * `workers` - A generic worker pool for running compilers off the render
//!   thread
//!
//! ## Architecture
//!
//! The crate follows a strict producer/consumer split:
//! * `MeshCompiler` is a pure, reentrant function object: chunk snapshot in,
//!   `MeshData` out. It knows nothing about threads or the GPU.
//! * `WorkerPool` runs one long-lived compiler per background thread and
//!   hands results back to the owning thread.
//! * `ChunkMeshScheduler` decides between the synchronous near-camera path
//!   and the background path, drains results once per frame, and performs
//!   the upload through an injected [`meshing::MeshUploader`].
//!
//! The GPU itself is out of scope: uploads go through an opaque trait the
//! host engine implements, and only the thread driving the scheduler ever
//! calls it.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxel_meshing::core::{MeshingConfig, MtResource};
//! use voxel_meshing::meshing::ChunkMeshScheduler;
//! # fn host_parts() -> (Arc<voxel_meshing::content::ContentIndex>,
//! #     Arc<dyn voxel_meshing::voxels::VoxelSampler>,
//! #     Arc<dyn voxel_meshing::lighting::LightSampler>,
//! #     voxel_meshing::meshing::NullUploader,
//! #     MtResource<voxel_meshing::voxels::Chunk>) { unimplemented!() }
//!
//! let (content, world, lights, uploader, chunk) = host_parts();
//! let mut scheduler = ChunkMeshScheduler::new(
//!     MeshingConfig::default(), content, world, lights, uploader);
//!
//! // Render loop:
//! let _ = scheduler.get_or_render(&chunk, false);
//! scheduler.update();
//! ```

pub mod content;
pub mod core;
pub mod lighting;
pub mod meshing;
pub mod voxels;
pub mod workers;
