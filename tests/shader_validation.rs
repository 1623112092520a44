//! Every WGSL source must parse and validate, and the uniform block must match
//! the host layout.

use morph_tree::gpu::layout::SceneUniforms;
use morph_tree::gpu::shaders;

fn validate(name: &str, source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| format!("{name}: WGSL parse error: {}", e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("{name}: WGSL validation error: {:?}", e))?;

    Ok(module)
}

#[test]
fn test_all_shaders_validate() {
    for (name, source) in shaders::ALL {
        if let Err(e) = validate(name, source) {
            panic!("{e}");
        }
    }
}

#[test]
fn test_entry_points_present() {
    for (name, source) in shaders::ALL {
        let module = validate(name, source).unwrap();
        let names: Vec<&str> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        assert!(names.contains(&shaders::VERTEX), "{name}: {names:?}");
        let fragment = if name == "ornament" {
            shaders::MESH_FRAGMENT
        } else {
            shaders::POINT_FRAGMENT
        };
        assert!(names.contains(&fragment), "{name}: {names:?}");
    }
}

#[test]
fn test_uniform_block_size_matches_host() {
    let module = validate("foliage", shaders::FOLIAGE).unwrap();
    let handle = module
        .types
        .iter()
        .find(|(_, ty)| ty.name.as_deref() == Some("SceneUniforms"))
        .map(|(handle, _)| handle)
        .expect("SceneUniforms struct in shader");

    let mut layouter = naga::proc::Layouter::default();
    layouter.update(module.to_ctx()).unwrap();

    assert_eq!(
        layouter[handle].size as usize,
        std::mem::size_of::<SceneUniforms>()
    );
}
