//! ecstore Protocol Definitions
//!
//! Wire messages and generated gRPC stubs spoken between the gateway and
//! the storage nodes.
//!
//! # Services
//! - `FragmentService` - Store/fetch erasure-coded fragments

/// Fragment service messages and client/server
pub mod fragment {
    /// Store one fragment under `id`, replacing any previous bytes
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct StoreFragmentRequest {
        #[prost(string, tag = "1")]
        pub id: ::prost::alloc::string::String,
        #[prost(bytes = "vec", tag = "2")]
        pub data: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct StoreFragmentResponse {
        #[prost(bool, tag = "1")]
        pub success: bool,
        /// Error detail when `success` is false
        #[prost(string, tag = "2")]
        pub message: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FetchFragmentRequest {
        #[prost(string, tag = "1")]
        pub id: ::prost::alloc::string::String,
    }

    /// `found` is false (and `data` empty) for unknown ids
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FetchFragmentResponse {
        #[prost(bool, tag = "1")]
        pub found: bool,
        #[prost(bytes = "vec", tag = "2")]
        pub data: ::prost::alloc::vec::Vec<u8>,
    }

    include!(concat!(env!("OUT_DIR"), "/ecstore.fragment.FragmentService.rs"));
}

// Re-export commonly used types
pub use fragment::fragment_service_client::FragmentServiceClient;
pub use fragment::fragment_service_server::{FragmentService, FragmentServiceServer};
