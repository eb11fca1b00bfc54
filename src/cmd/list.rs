use livefetch::Platform;

pub fn cmd_list() {
    for platform in Platform::ALL {
        println!(
            "{:<10} {:<10} {}",
            platform.id(),
            platform.display_name(),
            platform.url_template()
        );
    }
}
