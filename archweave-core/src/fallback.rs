//! Deterministic substitute content for failed generation calls
//!
//! Nothing here inspects the prompt. The prompt is quoted verbatim into a
//! fixed template, so the same input always renders the same document.

/// Render the fallback design document for an architecture-log prompt.
pub fn design_document(prompt: &str) -> String {
    let mut doc = String::new();
    doc.push_str("# Software Architecture Design\n\n");
    doc.push_str(&format!(
        "A starting design for \"{}\". Adjust it to the specific requirements and constraints of your project.\n\n",
        prompt
    ));
    doc.push_str(DESIGN_REQUIREMENTS);
    doc.push_str(HIGH_LEVEL_DIAGRAM);
    doc.push_str(DESIGN_STACK);
    doc.push_str(PIPELINE_DIAGRAM);
    doc.push_str(DESIGN_SECURITY);
    doc
}

/// Render the fallback answer for an issue-thread prompt.
///
/// The context note block is included only when `has_context` is true.
pub fn synthesize(prompt: &str, has_context: bool) -> String {
    let mut doc = String::new();

    if has_context {
        doc.push_str(CONTEXT_NOTE);
    }

    doc.push_str("# Solution to Your Question\n\n");
    doc.push_str("## **Problem Analysis**\n\n");
    doc.push_str(&format!(
        "Your question about \"{}\" is an important architectural consideration. {}\n\n",
        prompt,
        if has_context {
            "Based on your architecture design, here's a tailored solution:"
        } else {
            "Here's a comprehensive solution:"
        }
    ));

    doc.push_str(RECOMMENDED_APPROACH);
    doc.push_str(if has_context {
        "Building on your existing architecture:\n\n"
    } else {
        "Consider implementing:\n\n"
    });
    doc.push_str(ARCHITECTURE_DIAGRAM);
    doc.push_str(CONSIDERATIONS);
    doc.push_str(MONITORING_DIAGRAM);
    doc
}

/// Enhancement used when the enhancement endpoint is unavailable.
pub fn enhance_fallback(prompt: &str) -> String {
    format!(
        "Please design a comprehensive software architecture for: {}\n\n\
         Include:\n\
         - Functional and non-functional requirements\n\
         - Architectural patterns and styles\n\
         - High-level architecture diagram\n\
         - Technology stack recommendations\n\
         - Data management strategies\n\
         - Integration approaches\n\
         - Deployment considerations\n\
         - Scalability and performance aspects",
        prompt
    )
}

const DESIGN_REQUIREMENTS: &str = "## 1. **Functional Requirements**
- User authentication and authorization
- Data processing and management
- RESTful API endpoints

## 2. **Non-Functional Requirements**
- **Performance**: Response time < 200ms for 95% of requests
- **Availability**: 99.9% uptime
- **Maintainability**: Modular services with clear boundaries

## 3. **Architectural Patterns**
- **API Gateway**: Single entry point for clients
- **Event-Driven Integration**: Services communicate through an event bus

## 4. **High-Level Architecture Diagram**

";

const HIGH_LEVEL_DIAGRAM: &str = "```mermaid
graph TB
    Client[Client Applications] -->|HTTPS| Gateway[API Gateway]
    Gateway --> Auth[Auth Service]
    Gateway --> Core[Core Service]
    Auth --> UserDB[(User DB)]
    Core --> DataDB[(Data DB)]
    Core --> Cache[(Cache)]
    Core --> Events[Event Bus]
```

";

const DESIGN_STACK: &str = "## 5. **Data & Storage**
- Relational store for transactional data
- Cache-aside pattern for frequently read data
- Daily backups with point-in-time recovery

## 6. **Deployment Strategy**
- Containerized services behind a load balancer
- Horizontal autoscaling on CPU and memory
- Blue-green releases through the pipeline below

";

const PIPELINE_DIAGRAM: &str = "```mermaid
graph LR
    A[Code Commit] --> B[Build]
    B --> C[Test]
    C --> D[Deploy to Staging]
    D --> E[Deploy to Production]
    E --> F[Monitor]
```

";

const DESIGN_SECURITY: &str = "## 7. **Security & Observability**
- **Authentication**: Short-lived tokens with role-based access control
- **Encryption**: TLS in transit, encryption at rest
- **Monitoring**: Metrics, tracing and centralized logs with correlation ids
";

const CONTEXT_NOTE: &str = "> **Note**: This answer is based on your current architecture design context.\n\n";

const RECOMMENDED_APPROACH: &str = "## **Recommended Approach**

### **1. Immediate Actions**
- **Assess Current Implementation**: Review existing code and identify bottlenecks
- **Define Success Metrics**: Establish clear KPIs for measuring improvements
- **Create Migration Plan**: Plan for gradual rollout to minimize disruption

### **2. Technical Solution**

#### **Architecture Pattern**
";

const ARCHITECTURE_DIAGRAM: &str = "```mermaid
graph TB
    A[Client Layer] --> B[Load Balancer]
    B --> C[Service Mesh]
    C --> D[Service A]
    C --> E[Service B]
    D --> F[Cache Layer]
    E --> F
    F --> G[(Database)]
```

";

const CONSIDERATIONS: &str = "### **3. Key Considerations**

#### **Performance**
- **Response Time**: Target < 200ms for 95th percentile
- **Throughput**: Plan capacity for peak load, not average load

#### **Scalability**
- **Horizontal Scaling**: Add more service instances behind the load balancer
- **Caching**: Use a cache-aside pattern with TTLs matched to data volatility

#### **Security**
- **Input Validation**: Sanitize all user inputs
- **Rate Limiting**: Protect public endpoints from abuse
- **Encryption**: TLS for all data in transit

## **4. Monitoring & Alerts**

";

const MONITORING_DIAGRAM: &str = "```mermaid
graph LR
    A[Application] --> B[Metrics Collector]
    B --> C[Time Series DB]
    C --> D[Dashboard]
    C --> E[Alert Manager]
```
";
