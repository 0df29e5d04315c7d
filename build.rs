fn main() {
    #[cfg(windows)]
    {
        let mut res = winresource::WindowsResource::new();
        res.set("ProductName", "Device Monitor");
        res.set("FileDescription", "Hardware device monitor");
        if std::path::Path::new("assets/icon.ico").exists() {
            res.set_icon("assets/icon.ico");
        }
        if let Err(e) = res.compile() {
            println!("cargo:warning=failed to embed Windows resources: {}", e);
        }
    }
}
