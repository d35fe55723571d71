#[cfg(test)]
mod common;


#[cfg(test)]
mod cache_test;

#[cfg(test)]
mod pipeline_test;
