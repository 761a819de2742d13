mod common;
mod jobs;
mod routing;
