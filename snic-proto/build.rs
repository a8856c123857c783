fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().build_server(true).build_client(false).compile(
        &["proto/sn_common_v2.proto", "proto/sn_cfg_v2.proto", "proto/sn_p4_v2.proto"],
        &["proto"],
    )?;
    Ok(())
}
