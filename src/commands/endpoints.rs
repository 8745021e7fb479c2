use foisync::api::Endpoint;

pub fn endpoints() {
    println!("Supported Endpoints");
    println!("===================");
    for endpoint in Endpoint::all() {
        println!(
            "{}. {:<18} -> {}",
            endpoint.index(),
            endpoint.path(),
            endpoint.table()
        );
    }
}
