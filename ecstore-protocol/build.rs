//! Build script for generating the gRPC client/server stubs
//!
//! Messages are plain prost structs in `src/lib.rs`, so only the service
//! plumbing is generated here and no `protoc` is needed.

use tonic_build::manual::{Builder, Method, Service};

fn method(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::fragment::{}", input))
        .output_type(format!("crate::fragment::{}", output))
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let fragment_service = Service::builder()
        .name("FragmentService")
        .package("ecstore.fragment")
        .method(method(
            "store_fragment",
            "StoreFragment",
            "StoreFragmentRequest",
            "StoreFragmentResponse",
        ))
        .method(method(
            "fetch_fragment",
            "FetchFragment",
            "FetchFragmentRequest",
            "FetchFragmentResponse",
        ))
        .build();

    Builder::new()
        .build_server(true)
        .build_client(true)
        .compile(&[fragment_service]);
}
