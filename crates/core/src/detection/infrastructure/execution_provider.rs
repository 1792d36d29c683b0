use crate::detection::domain::detector_options::Delegate;

/// Execution providers for the requested delegate.
///
/// An empty list means ONNX Runtime's default CPU provider. `Gpu` maps to
/// the platform accelerator where one is compiled in.
pub fn execution_providers_for(
    delegate: Delegate,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    match delegate {
        Delegate::Cpu => Vec::new(),
        Delegate::Gpu => accelerated_providers(),
    }
}

fn accelerated_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::debug!("No GPU execution provider on this platform, running on CPU");
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_delegate_uses_default_provider() {
        assert!(execution_providers_for(Delegate::Cpu).is_empty());
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn test_gpu_delegate_falls_back_on_linux() {
        assert!(execution_providers_for(Delegate::Gpu).is_empty());
    }
}
