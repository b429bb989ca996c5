mod demo;

pub use demo::{create_demo_scene, mean_vertex_normals, GROUND_NAME};
