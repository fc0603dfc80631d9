mod approval;
mod common;
mod consistency;
mod routing;
