mod algorithms;
mod outline;
mod replicate;
