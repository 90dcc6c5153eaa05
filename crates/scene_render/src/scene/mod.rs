//! Scene data model
//!
//! Entities (meshes, cameras, lights) and the object registry that owns
//! them together with materials, shaders and surfaces.
//!
//! ## Ownership
//!
//! ```text
//! ObjectRegistry
//!   ├── entities  (Mesh | Camera | Light)  parent/child links by EntityId
//!   ├── surfaces                            owner link by EntityId
//!   ├── materials                           shader link by ShaderId
//!   └── shaders                             material list by MaterialId
//! ```
//!
//! Every cross-reference is an arena id, so removing an object can never
//! leave a dangling pointer behind; the registry clears the links that
//! named it.

pub mod bounds;
pub mod camera;
pub mod entity;
pub mod layers;
pub mod light;
pub mod mesh;
pub mod registry;

pub use bounds::{Aabb, OrientedBox};
pub use camera::{Camera, Projection};
pub use entity::{Entity, EntityConstants, EntityId, EntityKind, EntityType, MatrixSet};
pub use layers::LayerMask;
pub use light::{Light, LightRecord, LightType};
pub use mesh::{BoneMatrix, CollisionMode, Mesh, MAX_BONES};
pub use registry::ObjectRegistry;
