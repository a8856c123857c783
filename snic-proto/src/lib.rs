// Nested to mirror each proto package's dotted path exactly: prost emits
// cross-package field types (e.g. `sn.v2.ErrorCode` used from `sn_cfg.v2`)
// as `super`-relative paths rooted here, so the module tree below must
// match the package tree above one-for-one.
pub mod sn {
    pub mod v2 {
        tonic::include_proto!("sn.v2");
    }
}

pub mod sn_cfg {
    pub mod v2 {
        tonic::include_proto!("sn_cfg.v2");
    }
}

pub mod sn_p4 {
    pub mod v2 {
        tonic::include_proto!("sn_p4.v2");
    }
}
