// code-review-backend: Reviews Python code with an LLM and runs it on request

use actix_web::{services, web, App, HttpServer};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info, trace};

mod auth; // for checking the auth key of requests
mod cla_parser; // for parsing the command line arguments
mod code_interpreter; // for running the submitted Python code
mod logging; // for setting up the logger
mod review; // for requesting reviews from the LLM
mod runtime_checks; // for checking the setup before the server starts
mod session; // for the sessions, their history and the endpoints working on them
mod static_serve; // for serving static responses

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // What the user has passed in the command line
    let args = cla_parser::Args::parse();

    logging::setup_logger(&args);

    // Read from env file. This loads the environment variables from the .env file into `std::env::var`.
    match dotenv() {
        Ok(env_file) => info!("Reading from env file: {:?}", env_file),
        Err(e) => {
            error!("Error reading from env file due to error: {:?}. Note that the search for the env file starts at pwd, not where the executable lies. Falling back to defaults, may not work!", e);
            eprintln!("Error reading from env file due to error: {:?}. Note that the search for the env file starts at pwd, not where the executable lies. Falling back to defaults, may not work!", e);
        }
    }

    // Running the code interpreter from the command line doesn't need the server.
    if let Some(code) = args.execute {
        code_interpreter::prepare_execution::run_code_interpreter(&code);
    }

    if args.skip_checks {
        info!("Skipping the runtime checks.");
        // The auth key still has to be set, or no request can be authorized.
        match std::env::var("AUTH_KEY") {
            Ok(key) if !key.is_empty() => {
                let _ = auth::AUTH_KEY.set(key);
            }
            Ok(_) | Err(_) => {
                error!("AUTH_KEY is not set. Exiting...");
                eprintln!("AUTH_KEY is not set. Exiting...");
                std::process::exit(1);
            }
        }
    } else {
        runtime_checks::run_runtime_checks().await;
    }

    // Server information: host and port
    trace!(
        "Reading host and port from environment variables: {:?}:{:?}",
        std::env::var("HOST"),
        std::env::var("PORT")
    );
    let port = std::env::var("PORT").unwrap_or_else(|_| "8502".to_string());
    let port = port.parse::<u16>().unwrap_or_else(|_| {
        error!("Error parsing port number. Falling back to default port 8502");
        eprintln!("Error parsing port number. Falling back to default port 8502");
        8502
    });
    let host = std::env::var("HOST").unwrap_or_else(|_| "localhost".to_string());

    info!("Starting server at {}:{}", host, port);
    println!("Starting server at {}:{}", host, port);

    // Start the server
    HttpServer::new(|| {
        let services = services![
            web::scope("/ping").route("", web::get().to(static_serve::ping)), // Ping, reply with the version and the API description
            web::scope("/help").route("", web::get().to(static_serve::help)), // Help, reply with the documentation of all endpoints
            web::scope("/newsession") // NewSession, create an empty session
                .route("", web::get().to(session::new_session::new_session))
                .route("", web::post().to(session::new_session::new_session)),
            web::scope("/state").route("", web::get().to(session::get_state::get_state)), // State, get the working state of a session
            web::scope("/review").route("", web::post().to(session::review_code::review_code)), // Review, review code and store it in the history
            web::scope("/execute").route("", web::post().to(session::run_code::run_code)), // Execute, run code and attach the result
            web::scope("/applyfix").route("", web::post().to(session::apply_fix::apply_fix)), // ApplyFix, take over the suggested fix
            web::scope("/clear").route("", web::post().to(session::clear_session::clear_session)), // Clear, reset the working state
            web::scope("/history").route("", web::get().to(session::get_history::get_history)), // History, list the reviews of a session
            web::scope("/selecthistory")
                .route("", web::post().to(session::select_submission::select_submission)), // SelectHistory, restore a past review
            web::scope("/endsession").route("", web::post().to(session::end_session::end_session)), // EndSession, drop a session
        ];
        App::new()
            .service(services)
            .default_service(web::route().to(static_serve::not_found))
    })
    .bind((host, port))
    .unwrap_or_else(|_| {
        error!("Error binding to the address. Exiting...");
        eprintln!("Error binding to the address. Exiting...");
        std::process::exit(1);
    })
    .run()
    .await
}
