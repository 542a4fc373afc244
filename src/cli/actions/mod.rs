pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        server_id: String,
        otp_issuer: String,
        frontend_url: String,
        protect_info: bool,
        protect_logs: bool,
    },
}
