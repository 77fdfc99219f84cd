fn main() {
    resumable_upload_server::server::run()
}
